//! Order validation and the order-generation seam.
//!
//! Orders are plain strings such as `"A PAR - BUR"`: unit type, unit
//! location, then the action. The server publishes the legal orders per
//! location ([`PossibleOrders`]); [`validate_orders`] checks proposed orders
//! against that table before they are submitted.

use std::fmt;
use std::future::Future;

use dipwire_protocol::{GameId, PossibleOrders};
use dipwire_transport::Connection;

use crate::{Client, ClientError};

/// The order that gives up a build.
pub const WAIVE: &str = "WAIVE";

/// Why an order was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Fewer than three tokens, so no unit or no action.
    Malformed,
    /// No legal orders are listed for the unit's location.
    UnknownLocation(String),
    /// The location is known but this order is not among its legal orders.
    NotLegal(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed; expected 'A PAR H' style"),
            Self::UnknownLocation(loc) => write!(f, "no orderable unit at {loc}"),
            Self::NotLegal(loc) => write!(f, "not a legal order for {loc}"),
        }
    }
}

/// One rejected order and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOrder {
    pub order: String,
    pub reason: RejectReason,
}

/// The outcome of [`validate_orders`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderValidation {
    /// Accepted orders, whitespace-normalised, in input order.
    pub valid: Vec<String>,
    pub rejected: Vec<RejectedOrder>,
}

impl OrderValidation {
    /// `true` if at least one order was proposed and none was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && !self.valid.is_empty()
    }
}

/// Splits proposed orders into legal and rejected ones.
///
/// Whitespace is collapsed and blank orders are skipped. `WAIVE` is always
/// accepted. Anything else is accepted iff it is listed verbatim in
/// `possible` under the unit's location (the second token). A coasted
/// location such as `STP/SC` falls back to `STP` when only the bare
/// location is listed.
pub fn validate_orders<I, S>(raw: I, possible: &PossibleOrders) -> OrderValidation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut validation = OrderValidation::default();
    for order in raw {
        let tokens: Vec<&str> = order.as_ref().split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let normalised = tokens.join(" ");
        if normalised.eq_ignore_ascii_case(WAIVE) {
            validation.valid.push(WAIVE.to_string());
            continue;
        }
        if tokens.len() < 3 {
            validation.rejected.push(RejectedOrder {
                order: normalised,
                reason: RejectReason::Malformed,
            });
            continue;
        }

        let location = tokens[1];
        let legal = possible.get(location).or_else(|| {
            location
                .split_once('/')
                .and_then(|(base, _)| possible.get(base))
        });
        match legal {
            Some(legal) if legal.iter().any(|o| *o == normalised) => {
                validation.valid.push(normalised);
            }
            Some(_) => validation.rejected.push(RejectedOrder {
                order: normalised,
                reason: RejectReason::NotLegal(location.to_string()),
            }),
            None => validation.rejected.push(RejectedOrder {
                order: normalised,
                reason: RejectReason::UnknownLocation(location.to_string()),
            }),
        }
    }
    validation
}

/// A safe order set: hold every unit where holding is legal, otherwise take
/// the first listed order.
pub fn fallback_orders(possible: &PossibleOrders) -> Vec<String> {
    possible
        .values()
        .filter_map(|orders| {
            orders
                .iter()
                .find(|o| o.ends_with(" H"))
                .or_else(|| orders.first())
                .cloned()
        })
        .collect()
}

/// What an [`OrderGenerator`] is asked to decide on.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderContext {
    pub game_id: GameId,
    pub power_name: String,
    pub phase: Option<String>,
    pub possible_orders: PossibleOrders,
}

/// Produces raw order strings for one power and phase.
///
/// Implementations may be slow and may fail; the error string is surfaced
/// as [`ClientError::OrderGeneration`].
pub trait OrderGenerator: Send + Sync {
    fn propose_orders(
        &self,
        context: &OrderContext,
    ) -> impl Future<Output = Result<Vec<String>, String>> + Send;
}

impl<C: Connection> Client<C> {
    /// Fetches the legal orders, asks `generator` for orders, validates
    /// them and submits the result.
    ///
    /// If any proposed order is rejected, or none was proposed, the
    /// [`fallback_orders`] are submitted instead. Returns the orders that
    /// were submitted.
    pub async fn play_orders<G: OrderGenerator>(
        &self,
        generator: &G,
        phase: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let possible_orders = self.get_all_possible_orders(phase).await?;
        let (game_id, power_name) = self.with_session(|s| {
            s.game_context()
                .map(|(game_id, role)| (game_id.clone(), role.as_str().to_string()))
        })?;
        let context = OrderContext {
            game_id,
            power_name,
            phase: phase.map(str::to_string),
            possible_orders,
        };

        let proposed = generator
            .propose_orders(&context)
            .await
            .map_err(ClientError::OrderGeneration)?;
        let validation = validate_orders(&proposed, &context.possible_orders);
        let orders = if validation.is_clean() {
            validation.valid
        } else {
            for rejected in &validation.rejected {
                tracing::debug!(
                    power = %context.power_name,
                    order = %rejected.order,
                    reason = %rejected.reason,
                    "order rejected"
                );
            }
            tracing::warn!(
                power = %context.power_name,
                rejected = validation.rejected.len(),
                "submitting fallback orders"
            );
            fallback_orders(&context.possible_orders)
        };

        self.set_orders(orders.iter().cloned(), phase).await?;
        tracing::info!(
            power = %context.power_name,
            count = orders.len(),
            "orders submitted"
        );
        Ok(orders)
    }
}
