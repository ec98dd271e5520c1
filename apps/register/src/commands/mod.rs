//! # Register Commands
//!
//! The JSON-lines protocol: one request object per stdin line, one response
//! object per stdout line.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (protocol, dispatch)
//! ├── cart.rs     ◄─── Cart lines, discounts, coupons, customer, overrides
//! ├── payment.rs  ◄─── Tenders, settle, cancel
//! ├── held.rs     ◄─── Hold / recall
//! ├── catalog.rs  ◄─── Coupon catalog management
//! └── config.rs   ◄─── Configuration and health
//! ```
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdin                                                                  │
//! │  {"id":7,"command":"add_tender","kind":"cash","amount":5000}            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  parse_request ──► (id, Command::AddTender { kind, amount })            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  dispatch ──► payment::add_tender ──► session.add_tender()              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stdout                                                                 │
//! │  {"id":7,"ok":true,"data":{"total":9180,"paid":5000,"remaining":4180,..}}│
//! │  {"id":8,"ok":false,"error":{"code":"CART_ERROR","message":"..."}}      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are integer cents, percentages basis points.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod held;
pub mod payment;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use checkout_core::cart::LineItem;
use checkout_core::coupon::Coupon;
use checkout_core::{Customer, DiscountValue, Money, TenderKind};

use crate::error::ApiError;
use crate::state::AppState;

/// Every command the register accepts.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    // Cart
    GetCart,
    GetTotals,
    AddItem {
        item: LineItem,
    },
    RemoveItem {
        id: String,
    },
    UpdateQuantity {
        id: String,
        quantity: i64,
    },
    ApplyItemDiscount {
        id: String,
        discount: DiscountValue,
    },
    RemoveItemDiscount {
        id: String,
    },
    OverridePrice {
        id: String,
        price: Money,
    },
    ClearCart,

    // Discounts, coupons, customer
    ApplyCartDiscount {
        discount: DiscountValue,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        requires_override: bool,
    },
    RemoveCartDiscount,
    ApplyCoupon {
        code: String,
    },
    RemoveCoupon {
        code: String,
    },
    AttachCustomer {
        customer: Customer,
    },
    DetachCustomer,
    RedeemPoints {
        points: u64,
    },

    // Override gate
    ApproveOverride {
        approver: String,
    },
    RejectOverride {
        reason: String,
    },

    // Payment
    AddTender {
        kind: TenderKind,
        amount: Money,
    },
    RemoveTender {
        id: Uuid,
    },
    Settle,
    CancelPayment,

    // Held carts
    HoldCart {
        #[serde(default)]
        label: Option<String>,
    },
    RecallCart {
        id: Uuid,
    },
    ListHeldCarts,

    // Coupon catalog
    ListCoupons,
    CreateCoupon {
        coupon: Coupon,
    },
    UpdateCoupon {
        coupon: Coupon,
    },
    DeleteCoupon {
        code: String,
    },
    ResetCoupons,
    ReloadCoupons,

    // Register
    GetConfig,
    Health,
}

/// One response line.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    fn from_result(id: Option<Value>, result: Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Response {
                id,
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Response {
                id,
                ok: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// Splits a request line into its optional `id` and the command.
///
/// The `id` is echoed back even when the command itself is malformed.
pub fn parse_request(line: &str) -> (Option<Value>, Result<Command, ApiError>) {
    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return (None, Err(ApiError::invalid_request(e.to_string()))),
    };

    let id = value.as_object_mut().and_then(|obj| obj.remove("id"));
    let command =
        serde_json::from_value(value).map_err(|e| ApiError::invalid_request(e.to_string()));
    (id, command)
}

/// Handles one request line and returns the response line.
pub async fn handle_line(app: &AppState, line: &str) -> String {
    let (id, command) = parse_request(line);
    let result = match command {
        Ok(command) => dispatch(app, command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        warn!(code = ?e.code, message = %e.message, "Command failed");
    }

    let response = Response::from_result(id, result);
    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"ok":false,"error":{{"code":"INTERNAL","message":"{}"}}}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(result?)?)
}

/// Routes a command to its handler.
pub async fn dispatch(app: &AppState, command: Command) -> Result<Value, ApiError> {
    debug!(?command, "dispatch");

    match command {
        Command::GetCart => respond(Ok(cart::get_cart(app))),
        Command::GetTotals => respond(Ok(cart::get_totals(app))),
        Command::AddItem { item } => respond(cart::add_item(app, item)),
        Command::RemoveItem { id } => respond(cart::remove_item(app, &id)),
        Command::UpdateQuantity { id, quantity } => {
            respond(cart::update_quantity(app, &id, quantity))
        }
        Command::ApplyItemDiscount { id, discount } => {
            respond(cart::apply_item_discount(app, &id, discount))
        }
        Command::RemoveItemDiscount { id } => respond(cart::remove_item_discount(app, &id)),
        Command::OverridePrice { id, price } => respond(cart::override_price(app, &id, price)),
        Command::ClearCart => respond(cart::clear_cart(app)),

        Command::ApplyCartDiscount {
            discount,
            reason,
            requires_override,
        } => respond(cart::apply_cart_discount(
            app,
            discount,
            reason,
            requires_override,
        )),
        Command::RemoveCartDiscount => respond(cart::remove_cart_discount(app)),
        Command::ApplyCoupon { code } => respond(cart::apply_coupon(app, &code)),
        Command::RemoveCoupon { code } => respond(cart::remove_coupon(app, &code)),
        Command::AttachCustomer { customer } => respond(cart::attach_customer(app, customer)),
        Command::DetachCustomer => respond(cart::detach_customer(app)),
        Command::RedeemPoints { points } => respond(cart::redeem_points(app, points)),

        Command::ApproveOverride { approver } => respond(cart::approve_override(app, approver)),
        Command::RejectOverride { reason } => respond(cart::reject_override(app, reason)),

        Command::AddTender { kind, amount } => respond(payment::add_tender(app, kind, amount)),
        Command::RemoveTender { id } => respond(payment::remove_tender(app, id)),
        Command::Settle => respond(payment::settle(app)),
        Command::CancelPayment => respond(payment::cancel_payment(app)),

        Command::HoldCart { label } => respond(held::hold_cart(app, label)),
        Command::RecallCart { id } => respond(held::recall_cart(app, id)),
        Command::ListHeldCarts => respond(Ok(held::list_held_carts(app))),

        Command::ListCoupons => respond(Ok(catalog::list_coupons(app))),
        Command::CreateCoupon { coupon } => respond(catalog::create_coupon(app, coupon)),
        Command::UpdateCoupon { coupon } => respond(catalog::update_coupon(app, coupon)),
        Command::DeleteCoupon { code } => respond(catalog::delete_coupon(app, &code)),
        Command::ResetCoupons => respond(Ok(catalog::reset_coupons(app))),
        Command::ReloadCoupons => respond(catalog::reload_coupons(app).await),

        Command::GetConfig => respond(Ok(config::get_config(app))),
        Command::Health => respond(config::health(app).await),
    }
}
