pub mod fiscal_quarter;
