pub mod fee_calculator;
