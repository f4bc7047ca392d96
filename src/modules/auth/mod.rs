pub mod controller;
pub mod ledger;
pub mod model;
pub mod router;
pub mod service;
