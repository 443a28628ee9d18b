pub mod customer;
pub mod order;
pub mod payment;

pub use customer::Entity as Customer;
pub use order::Entity as Order;
pub use payment::Entity as Payment;
