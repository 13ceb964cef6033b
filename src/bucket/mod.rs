pub mod engine;
pub mod fsops;
pub mod history;
pub mod paths;
pub mod report;
pub mod settings;
pub mod util;
