mod addressing;
mod applications;
mod determinism;
mod mobility;
mod scheduler;
