//! Order state machine
//!
//! The authoritative transition table. Illegal transitions are rejected,
//! never coerced; callers decide whether the triggering event is still
//! recorded (the webhook ingestor always records it for audit).
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Created | intent created | AwaitingPayment |
//! | AwaitingPayment | payment approved | Paid |
//! | AwaitingPayment | payment rejected | PaymentFailed |
//! | Paid | fulfillment started | FulfillmentPending |
//! | FulfillmentPending | carrier dispatched | Shipped |
//! | Shipped | carrier delivered | Delivered |
//! | Paid, Shipped, Delivered | refund approved | Refunded |
//! | Created, AwaitingPayment | admin cancelled | Cancelled |

use shared::order::{OrderEventKind, OrderState};
use shared::{PipelineError, PipelineResult};

/// Apply an event to a state, returning the next state
///
/// Any (state, event) pair without a matching table row fails with
/// [`PipelineError::IllegalTransition`] and leaves the order untouched.
pub fn apply(current: OrderState, event: OrderEventKind) -> PipelineResult<OrderState> {
    use OrderEventKind as E;
    use OrderState as S;

    let next = match (current, event) {
        (S::Created, E::IntentCreated) => S::AwaitingPayment,
        (S::AwaitingPayment, E::PaymentApproved) => S::Paid,
        (S::AwaitingPayment, E::PaymentRejected) => S::PaymentFailed,
        (S::Paid, E::FulfillmentStarted) => S::FulfillmentPending,
        (S::FulfillmentPending, E::CarrierDispatched) => S::Shipped,
        (S::Shipped, E::CarrierDelivered) => S::Delivered,
        (S::Paid | S::Shipped | S::Delivered, E::RefundApproved) => S::Refunded,
        (S::Created | S::AwaitingPayment, E::AdminCancelled) => S::Cancelled,
        (from, event) => {
            return Err(PipelineError::IllegalTransition {
                from: from.to_string(),
                event: event.to_string(),
            });
        }
    };
    Ok(next)
}
