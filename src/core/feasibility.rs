use thiserror::Error;

use crate::models::{Job, Truck};

/// Why a (job, truck) pair cannot be matched at all.
///
/// These are hard pass/fail preconditions, independent of scoring
/// weights; an infeasible pair is excluded from ranked output rather
/// than reported as an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Infeasibility {
    #[error("truck weight capacity {available_kg}kg below required {required_kg}kg")]
    WeightCapacity {
        required_kg: f64,
        available_kg: f64,
    },

    #[error("truck volume capacity {available_m3}m3 below required {required_m3}m3")]
    VolumeCapacity {
        required_m3: f64,
        available_m3: f64,
    },

    #[error("truck does not support cargo type '{cargo}'")]
    UnsupportedCargo { cargo: &'static str },

    #[error("truck availability does not overlap the pickup window")]
    WindowMismatch,
}

/// Check every hard filter, failing fast on the first violation
pub fn check_feasibility(job: &Job, truck: &Truck) -> Result<(), Infeasibility> {
    if truck.capacity_kg < job.weight_kg {
        return Err(Infeasibility::WeightCapacity {
            required_kg: job.weight_kg,
            available_kg: truck.capacity_kg,
        });
    }

    if truck.capacity_m3 < job.volume_m3 {
        return Err(Infeasibility::VolumeCapacity {
            required_m3: job.volume_m3,
            available_m3: truck.capacity_m3,
        });
    }

    if !truck.supports(job.cargo_type) {
        return Err(Infeasibility::UnsupportedCargo {
            cargo: job.cargo_type.as_str(),
        });
    }

    if truck.availability.overlap_minutes(&job.pickup_window).is_none() {
        return Err(Infeasibility::WindowMismatch);
    }

    Ok(())
}
