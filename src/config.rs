// Centralized configuration for simulation parameters

// ====================
// Force Kernel
// ====================
/// Coupling constant for the pairwise interaction force.
pub const FORCE_COUPLING: f64 = 1.0e-3;
/// Floor applied to the squared distance between two particles. Keeps the
/// force finite when two particles coincide, at the cost of underestimating
/// it at extreme proximity.
pub const SINGULARITY_FLOOR: f64 = 1.0e-6;

// ====================
// Generating Field
// ====================
/// Escape radius for the field iteration.
pub const FIELD_ESCAPE_RADIUS: f64 = 2.0;

// ====================
// Particle Generation
// ====================
/// Blend factor for the acceptance threshold: cells whose field value lies in
/// `[(vmax + (BLEND-1)*vmin)/BLEND, vmax]` spawn a particle.
pub const THRESHOLD_BLEND: f64 = 30.0;
/// Field value to particle weight scale.
pub const WEIGHT_SCALE: f64 = 10.0;

// ====================
// Output
// ====================
/// Default number of steps between population dumps.
pub const DEFAULT_DUMP_INTERVAL: usize = 10;
/// Number of entries in the visualization color map.
pub const COLOR_LEVELS: usize = 256;

// ====================
// Threading/Parallelism
// ====================
pub const MIN_THREADS: usize = 3; // Minimum number of threads to use
pub const THREADS_LEAVE_FREE: usize = 2; // Number of logical cores to leave free
