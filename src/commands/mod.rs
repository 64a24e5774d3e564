pub mod backtest;
pub mod realtime;
