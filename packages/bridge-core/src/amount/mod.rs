pub mod amount_math;
