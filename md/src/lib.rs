pub mod context;
pub mod eckart;
pub mod model;
pub mod propagator;
pub mod record;
pub mod run_md;

pub use context::{SimulationContext, Thermostat};
pub use eckart::EckartBarrier;
pub use model::CollinearModel;
pub use propagator::{
    BeadArray, Propagator, PropagatorError, RecrossingContribution, Restraint, TrajectoryOptions,
    UmbrellaMoments,
};
pub use run_md::{ForceProvider, Integrator, RingPolymerVerlet};
