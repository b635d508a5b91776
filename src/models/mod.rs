pub mod expense;
pub mod user;

pub use expense::{Expense, NewExpense};
pub use user::{User, UserId};
