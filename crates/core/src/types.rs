/// Job identifiers are assigned by the intake layer and treated as opaque.
pub type JobId = String;
