pub mod clock;
pub mod middleware;
pub mod signing;
pub mod validation;
