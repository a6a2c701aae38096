use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("cannot measure unit size: projected probe points coincide")]
    DegenerateUnitProbe,
}
