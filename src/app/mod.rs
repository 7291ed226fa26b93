// Application layer: one pipeline per batch job, wired to the ports in domain.

pub mod pipelines;
