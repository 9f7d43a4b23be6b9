//! Execution platform resolution.
//!
//! A platform is a named backend for the force kernels plus its
//! platform-specific options, resolved once per benchmark configuration:
//!
//! - `CPU`: always available; `Threads` sizes a dedicated rayon pool.
//! - `CUDA`: behind the `cuda` cargo feature; `DeviceIndex` is a
//!   comma-separated ordinal list, `Precision` selects kernel precision.
//! - `OpenCL`: recognized, but no backend exists in this workspace;
//!   resolution fails recoverably so the benchmark reports it as 0.00.
//!
//! Any other name fails recoverably too; an unavailable platform must
//! never abort the whole benchmark batch.

use std::collections::BTreeMap;
use std::fmt;

use velo_core::{Result, VeloError};

/// Ordered string-to-string platform options.
#[derive(Debug, Clone, Default)]
pub struct PlatformOptions {
    map: BTreeMap<String, String>,
}

impl PlatformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Display for PlatformOptions {
    /// Renders like a dict literal: `{"Threads": "4"}`, or `{}` when empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {:?}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// CPU execution backend with an optional dedicated thread pool.
pub struct CpuPlatform {
    pool: Option<rayon::ThreadPool>,
    threads: Option<usize>,
}

impl CpuPlatform {
    fn resolve(options: &PlatformOptions) -> Result<Self> {
        let threads = match options.get("Threads") {
            Some(raw) => {
                let n: usize = raw.parse().map_err(|_| {
                    VeloError::config(format!("Threads must be a positive integer, got '{raw}'"))
                })?;
                if n == 0 {
                    return Err(VeloError::config("Threads must be a positive integer"));
                }
                Some(n)
            }
            None => None,
        };

        let pool = match threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| VeloError::config(format!("thread pool: {e}")))?,
            ),
            None => None,
        };

        Ok(Self { pool, threads })
    }

    /// Runs `f` inside this platform's pool (or the global one).
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    pub fn threads(&self) -> Option<usize> {
        self.threads
    }
}

/// A resolved execution platform.
pub enum Platform {
    Cpu(CpuPlatform),
    #[cfg(feature = "cuda")]
    Cuda(crate::cuda::CudaPlatform),
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Cpu(_) => f.write_str("Platform::Cpu"),
            #[cfg(feature = "cuda")]
            Platform::Cuda(_) => f.write_str("Platform::Cuda"),
        }
    }
}

impl Platform {
    /// Resolves a platform by name with its options.
    ///
    /// Every failure here is recoverable by contract: the caller converts
    /// it into a zero-throughput benchmark entry.
    pub fn resolve(name: &str, options: &PlatformOptions) -> Result<Platform> {
        match name {
            "CPU" => Ok(Platform::Cpu(CpuPlatform::resolve(options)?)),
            "CUDA" => Self::resolve_cuda(options),
            "OpenCL" => Err(VeloError::platform(
                name,
                "no OpenCL backend in this build",
            )),
            _ => Err(VeloError::platform(name, "unknown platform name")),
        }
    }

    #[cfg(feature = "cuda")]
    fn resolve_cuda(options: &PlatformOptions) -> Result<Platform> {
        Ok(Platform::Cuda(crate::cuda::CudaPlatform::resolve(options)?))
    }

    #[cfg(not(feature = "cuda"))]
    fn resolve_cuda(_options: &PlatformOptions) -> Result<Platform> {
        Err(VeloError::platform(
            "CUDA",
            "built without the `cuda` feature",
        ))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Cpu(_) => "CPU",
            #[cfg(feature = "cuda")]
            Platform::Cuda(_) => "CUDA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_render_as_dict_literal() {
        assert_eq!(PlatformOptions::new().to_string(), "{}");

        let opts = PlatformOptions::from_pairs(&[("Threads", "1")]);
        assert_eq!(opts.to_string(), r#"{"Threads": "1"}"#);

        // BTreeMap ordering: DeviceIndex before Precision.
        let opts = PlatformOptions::from_pairs(&[("Precision", "single"), ("DeviceIndex", "0,1")]);
        assert_eq!(
            opts.to_string(),
            r#"{"DeviceIndex": "0,1", "Precision": "single"}"#
        );
    }

    #[test]
    fn cpu_resolves_with_thread_count() {
        let opts = PlatformOptions::from_pairs(&[("Threads", "2")]);
        let platform = Platform::resolve("CPU", &opts).expect("CPU resolves");
        match platform {
            Platform::Cpu(cpu) => assert_eq!(cpu.threads(), Some(2)),
            #[cfg(feature = "cuda")]
            _ => panic!("expected CPU platform"),
        }
    }

    #[test]
    fn cpu_rejects_bad_thread_count() {
        for bad in ["0", "-1", "many"] {
            let opts = PlatformOptions::from_pairs(&[("Threads", bad)]);
            let err = Platform::resolve("CPU", &opts).unwrap_err();
            assert!(err.is_recoverable(), "'{bad}' should be a recoverable error");
        }
    }

    #[test]
    fn unknown_platforms_fail_recoverably() {
        for name in ["QUANTUM", "OpenCL", "Metal"] {
            let err = Platform::resolve(name, &PlatformOptions::new()).unwrap_err();
            assert!(err.is_recoverable(), "{name} must not abort the batch");
        }
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn cuda_unavailable_without_feature() {
        let opts = PlatformOptions::from_pairs(&[("DeviceIndex", "0")]);
        let err = Platform::resolve("CUDA", &opts).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("cuda"));
    }
}
