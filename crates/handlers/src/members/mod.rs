//! Member remarks carrying a payment.
//!
//! Since runtime v2001 `Members.member_remark` can move funds from the
//! signing account to a recipient. Remarks without payment, and every remark
//! on older runtimes, carry no transfer.

mod handler;

pub use handler::RemarkPaymentHandler;
