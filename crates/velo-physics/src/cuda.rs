//! CUDA nonbonded backend (feature `cuda`).
//!
//! The O(n²) nonbonded loop runs on the configured CUDA device(s); bonded
//! terms and integration stay on the host. With several devices listed in
//! `DeviceIndex`, atom rows are split contiguously across them and partial
//! force blocks are merged on the host after synchronization.

use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;

use velo_core::{Result, VeloError};

use crate::platform::PlatformOptions;
use crate::system::NonbondedSettings;
use crate::topology::Topology;

/// Soft-core LJ + cutoff Coulomb, one thread per target atom row.
/// Exclusion lists arrive in CSR form (offsets + flattened indices).
const NONBONDED_KERNEL: &str = r#"
extern "C" __global__ void nonbonded_forces(
    const float* pos,
    const float* charge,
    const float* sigma,
    const float* epsilon,
    const int* excl_off,
    const int* excl_idx,
    float* out_force,
    int n_atoms,
    int row_start,
    int row_count,
    float cutoff_sq,
    float softcore_delta_sq,
    float min_dist_sq)
{
    int row = blockIdx.x * blockDim.x + threadIdx.x;
    if (row >= row_count) return;
    int i = row_start + row;

    const float COULOMB = 332.0636f;

    float xi = pos[3 * i];
    float yi = pos[3 * i + 1];
    float zi = pos[3 * i + 2];
    float qi = charge[i];
    float sig_i = sigma[i];
    float eps_i = epsilon[i];

    int e_begin = excl_off[i];
    int e_end = excl_off[i + 1];

    float fx = 0.0f, fy = 0.0f, fz = 0.0f;

    for (int j = 0; j < n_atoms; j++) {
        if (j == i) continue;

        int skip = 0;
        for (int e = e_begin; e < e_end; e++) {
            if (excl_idx[e] == j) { skip = 1; break; }
        }
        if (skip) continue;

        float dx = pos[3 * j] - xi;
        float dy = pos[3 * j + 1] - yi;
        float dz = pos[3 * j + 2] - zi;
        float dist_sq = dx * dx + dy * dy + dz * dz;
        if (dist_sq > cutoff_sq) continue;

        float eff_sq = fmaxf(dist_sq, min_dist_sq) + softcore_delta_sq;
        float inv_eff = rsqrtf(eff_sq);

        float sig = 0.5f * (sig_i + sigma[j]);
        float eps = sqrtf(eps_i * epsilon[j]);

        float s2 = sig * sig / eff_sq;
        float t6 = s2 * s2 * s2;
        float t12 = t6 * t6;

        float dist = fmaxf(sqrtf(dist_sq), 0.01f);
        float chain = dist * inv_eff;

        float lj = 24.0f * eps * inv_eff * (2.0f * t12 - t6) * chain;
        float coul = COULOMB * qi * charge[j] * inv_eff * inv_eff * chain;
        float mag = (lj + coul) / dist;

        fx -= mag * dx;
        fy -= mag * dy;
        fz -= mag * dz;
    }

    out_force[3 * row] = fx;
    out_force[3 * row + 1] = fy;
    out_force[3 * row + 2] = fz;
}
"#;

/// Immutable per-device topology buffers, uploaded once per benchmark run.
struct DeviceTopology {
    charges: CudaSlice<f32>,
    sigma: CudaSlice<f32>,
    epsilon: CudaSlice<f32>,
    excl_off: CudaSlice<i32>,
    excl_idx: CudaSlice<i32>,
    n_atoms: usize,
}

/// One bound CUDA device: context, stream and compiled kernel.
struct BoundDevice {
    ordinal: usize,
    /// Keeps the driver context alive for the stream and buffers.
    #[allow(dead_code)]
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    kernel: CudaFunction,
    topology: Option<DeviceTopology>,
}

/// CUDA execution platform over one or more devices.
pub struct CudaPlatform {
    devices: Vec<BoundDevice>,
}

impl CudaPlatform {
    /// Resolves the devices in `DeviceIndex` and compiles the kernel on each.
    pub fn resolve(options: &PlatformOptions) -> Result<Self> {
        match options.get("Precision").unwrap_or("single") {
            "single" | "mixed" => {}
            other => {
                return Err(VeloError::config(format!(
                    "unsupported Precision '{other}' (this backend is single precision)"
                )))
            }
        }

        let ordinals: Vec<usize> = options
            .get("DeviceIndex")
            .unwrap_or("0")
            .split(',')
            .map(|s| {
                s.trim().parse::<usize>().map_err(|_| {
                    VeloError::config(format!("DeviceIndex entry '{s}' is not an ordinal"))
                })
            })
            .collect::<Result<_>>()?;
        if ordinals.is_empty() {
            return Err(VeloError::config("DeviceIndex resolved to no devices"));
        }

        let ptx = compile_ptx(NONBONDED_KERNEL)
            .map_err(|e| VeloError::gpu("nvrtc", e.to_string()))?;

        let mut devices = Vec::with_capacity(ordinals.len());
        for ordinal in ordinals {
            let ctx = CudaContext::new(ordinal).map_err(|e| {
                VeloError::platform("CUDA", format!("device {ordinal}: {e}"))
            })?;
            let module = ctx
                .load_module(ptx.clone())
                .map_err(|e| VeloError::gpu("module load", e.to_string()))?;
            let kernel = module
                .load_function("nonbonded_forces")
                .map_err(|e| VeloError::gpu("kernel lookup", e.to_string()))?;
            let stream = ctx.default_stream();
            devices.push(BoundDevice {
                ordinal,
                ctx,
                stream,
                kernel,
                topology: None,
            });
        }

        log::info!(
            "🚀 CUDA platform ready on device(s) {:?}",
            devices.iter().map(|d| d.ordinal).collect::<Vec<_>>()
        );
        Ok(Self { devices })
    }

    /// Uploads the immutable topology buffers to every bound device.
    pub fn bind_system(&mut self, topo: &Topology) -> Result<()> {
        let charges: Vec<f32> = topo.charges.clone();
        let sigma: Vec<f32> = topo
            .lj_params
            .iter()
            .map(|p| p.rmin_half * 1.781_797_4)
            .collect();
        let epsilon: Vec<f32> = topo.lj_params.iter().map(|p| p.epsilon).collect();

        // CSR exclusion lists.
        let mut excl_off: Vec<i32> = Vec::with_capacity(topo.n_atoms + 1);
        let mut excl_idx: Vec<i32> = Vec::new();
        excl_off.push(0);
        for list in &topo.excluded {
            excl_idx.extend(list.iter().map(|&x| x as i32));
            excl_off.push(excl_idx.len() as i32);
        }

        for device in &mut self.devices {
            let stream = &device.stream;
            let upload = |data: &[f32]| -> Result<CudaSlice<f32>> {
                stream
                    .memcpy_stod(data)
                    .map_err(|e| VeloError::gpu("topology upload", e.to_string()))
            };
            let upload_i32 = |data: &[i32]| -> Result<CudaSlice<i32>> {
                stream
                    .memcpy_stod(data)
                    .map_err(|e| VeloError::gpu("topology upload", e.to_string()))
            };
            device.topology = Some(DeviceTopology {
                charges: upload(&charges)?,
                sigma: upload(&sigma)?,
                epsilon: upload(&epsilon)?,
                excl_off: upload_i32(&excl_off)?,
                excl_idx: upload_i32(&excl_idx)?,
                n_atoms: topo.n_atoms,
            });
        }
        Ok(())
    }

    /// Computes nonbonded forces for all atoms across the bound devices.
    pub fn nonbonded_forces(
        &self,
        nb: &NonbondedSettings,
        positions: &[[f64; 3]],
    ) -> Result<Vec<[f64; 3]>> {
        let n = positions.len();
        let pos_f32: Vec<f32> = positions
            .iter()
            .flat_map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect();

        let n_devices = self.devices.len();
        let rows_per_device = n.div_ceil(n_devices);

        // Launch one contiguous row block per device, then gather.
        let mut partials: Vec<(usize, Vec<f32>)> = Vec::with_capacity(n_devices);
        let mut outputs: Vec<(usize, usize, CudaSlice<f32>)> = Vec::with_capacity(n_devices);

        for (d, device) in self.devices.iter().enumerate() {
            let row_start = d * rows_per_device;
            if row_start >= n {
                break;
            }
            let row_count = rows_per_device.min(n - row_start);

            let topo = device.topology.as_ref().ok_or_else(|| {
                VeloError::gpu("nonbonded", "no topology bound to CUDA platform")
            })?;
            if topo.n_atoms != n {
                return Err(VeloError::gpu(
                    "nonbonded",
                    format!("bound topology has {} atoms, positions {}", topo.n_atoms, n),
                ));
            }

            let stream = &device.stream;
            let pos_dev = stream
                .memcpy_stod(&pos_f32)
                .map_err(|e| VeloError::gpu("position upload", e.to_string()))?;
            let mut out = stream
                .alloc_zeros::<f32>(row_count * 3)
                .map_err(|e| VeloError::gpu("force alloc", e.to_string()))?;

            let n_i32 = n as i32;
            let row_start_i32 = row_start as i32;
            let row_count_i32 = row_count as i32;
            let cutoff_sq = (nb.cutoff * nb.cutoff) as f32;
            let softcore = nb.softcore_delta_sq as f32;
            let min_dist = nb.min_dist_sq as f32;

            let cfg = LaunchConfig::for_num_elems(row_count as u32);
            let mut launch = stream.launch_builder(&device.kernel);
            launch
                .arg(&pos_dev)
                .arg(&topo.charges)
                .arg(&topo.sigma)
                .arg(&topo.epsilon)
                .arg(&topo.excl_off)
                .arg(&topo.excl_idx)
                .arg(&mut out)
                .arg(&n_i32)
                .arg(&row_start_i32)
                .arg(&row_count_i32)
                .arg(&cutoff_sq)
                .arg(&softcore)
                .arg(&min_dist);
            unsafe {
                launch
                    .launch(cfg)
                    .map_err(|e| VeloError::gpu("kernel launch", e.to_string()))?;
            }
            outputs.push((row_start, row_count, out));
        }

        for ((row_start, _row_count, out), device) in outputs.into_iter().zip(&self.devices) {
            let host = device
                .stream
                .memcpy_dtov(&out)
                .map_err(|e| VeloError::gpu("force download", e.to_string()))?;
            device
                .stream
                .synchronize()
                .map_err(|e| VeloError::gpu("synchronize", e.to_string()))?;
            partials.push((row_start, host));
        }

        let mut forces = vec![[0.0_f64; 3]; n];
        for (row_start, block) in partials {
            for (r, chunk) in block.chunks_exact(3).enumerate() {
                forces[row_start + r] = [chunk[0] as f64, chunk[1] as f64, chunk[2] as f64];
            }
        }
        Ok(forces)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
