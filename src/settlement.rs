//! Turning a verified checkout into a stored order, and the admin refund path.
//!
//! Only the signature check and the order insert can fail a settlement. Shipment creation,
//! the payment-method lookup, the stock decrement and the shipment record degrade: they are
//! logged and the order goes ahead without them.

use log::{info, warn};
use mongodb::bson::{oid::ObjectId, DateTime};
use rand::Rng;
use thiserror::Error;

use crate::models::{parse_object_id, Order, OrderStatus, Product, Shipment, VerifyPaymentInput};
use crate::payment::{PaymentError, PaymentGateway, RefundRequest};
use crate::shipping::{Consignment, ShipmentOrder, ShippingProvider};
use crate::store::{Store, StoreError};

pub const DEFAULT_ADDRESS: &str = "KropKart Hub";
pub const DEFAULT_PINCODE: &str = "110001";
const FALLBACK_PAYMENT_METHOD: &str = "Razorpay";
const REFUND_REASON: &str = "Admin initiated refund via KropKart Dashboard";

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Razorpay client not initialized on server")]
    GatewayUnavailable,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Invalid payment amount")]
    InvalidAmount,
    #[error("Security Check Failed: Payment Signature Mismatch")]
    SignatureMismatch,
    #[error("Could not record order: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RefundError {
    #[error("Order not found.")]
    OrderNotFound,
    #[error("No payment ID found for this order. Cannot refund.")]
    MissingPaymentId,
    #[error("Razorpay client not ready.")]
    GatewayUnavailable,
    #[error("Refund Failed: {0}")]
    Gateway(#[from] PaymentError),
    #[error("Refund Failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct Buyer {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Settled {
    pub order_id: ObjectId,
    pub shipment_id: Option<i64>,
    pub remaining_stock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefundOutcome {
    Refunded { refund_id: String, amount: i64 },
    AlreadyRefunded,
}

/// The collaborators a settlement needs, borrowed from the application state.
pub struct Settlement<'a> {
    pub store: &'a dyn Store,
    pub gateway: Option<&'a dyn PaymentGateway>,
    pub shipping: Option<&'a dyn ShippingProvider>,
}

impl<'a> Settlement<'a> {
    pub async fn settle(&self, buyer: &Buyer, checkout: &VerifyPaymentInput) -> Result<Settled, SettlementError> {
        let gateway = self.gateway.ok_or(SettlementError::GatewayUnavailable)?;
        if checkout.quantity < 1 {
            return Err(SettlementError::InvalidQuantity);
        }
        if checkout.amount <= 0 {
            return Err(SettlementError::InvalidAmount);
        }

        if let Err(e) = gateway.verify_payment_signature(
            &checkout.razorpay_order_id,
            &checkout.razorpay_payment_id,
            &checkout.razorpay_signature,
        ) {
            warn!(
                "Signature check failed for order {} payment {}: {}",
                checkout.razorpay_order_id, checkout.razorpay_payment_id, e
            );
            return Err(SettlementError::SignatureMismatch);
        }

        let product_id = parse_object_id(&checkout.product_id);
        let product = match product_id {
            Some(id) => self.store.find_product(id).await?,
            None => None,
        };
        if product.is_none() {
            warn!("Settling payment {} for unknown product {}", checkout.razorpay_payment_id, checkout.product_id);
        }

        let address = checkout.address.as_deref().filter(|a| !a.trim().is_empty()).unwrap_or(DEFAULT_ADDRESS);
        let pincode = checkout.pincode.as_deref().filter(|p| !p.trim().is_empty()).unwrap_or(DEFAULT_PINCODE);

        // The signature does not cover the amount; the gateway's own record wins when it has one.
        let (payment_method, amount) = match gateway.fetch_payment(&checkout.razorpay_payment_id).await {
            Ok(details) => {
                let amount = match details.amount {
                    Some(captured) if captured != checkout.amount => {
                        warn!(
                            "Payment {} captured {} paise but checkout claimed {}",
                            checkout.razorpay_payment_id, captured, checkout.amount
                        );
                        captured
                    }
                    _ => checkout.amount,
                };
                let method = details
                    .method
                    .map(|m| m.to_uppercase())
                    .unwrap_or_else(|| FALLBACK_PAYMENT_METHOD.to_string());
                (method, amount)
            }
            Err(e) => {
                warn!("Could not look up payment {}: {}", checkout.razorpay_payment_id, e);
                (FALLBACK_PAYMENT_METHOD.to_string(), checkout.amount)
            }
        };

        let shipment_id = match (self.shipping, &product) {
            (Some(shipping), Some(product)) => {
                self.dispatch(shipping, buyer, checkout, product, amount, address, pincode).await
            }
            _ => None,
        };

        let order = Order {
            id: None,
            buyer: buyer.email.clone(),
            product_id: checkout.product_id.clone(),
            product_name: product.as_ref().map(|p| p.name.clone()).unwrap_or_else(|| "Unknown".to_string()),
            quantity: checkout.quantity,
            amount,
            payment_method,
            delivery_address: address.to_string(),
            pincode: pincode.to_string(),
            status: OrderStatus::Paid,
            delivery_status: "Processing".to_string(),
            shipment_id,
            payment_id: Some(checkout.razorpay_payment_id.clone()),
            gateway_order_id: Some(checkout.razorpay_order_id.clone()),
            refund_id: None,
            refunded_at: None,
            date: DateTime::now(),
        };
        let order_id = self.store.insert_order(&order).await?;

        // Not atomic with the insert above: a crash here leaves the stock untouched.
        let mut remaining_stock = None;
        if let (Some(id), Some(product)) = (product_id, &product) {
            match self.store.decrement_stock(id, checkout.quantity).await {
                Ok(left) => {
                    info!("Stock of {} now {:?}", product.name, left);
                    remaining_stock = left;
                }
                Err(e) => warn!("Could not decrement stock of {}: {}", product.name, e),
            }
        }

        if let Some(shipment_id) = shipment_id {
            let record = Shipment {
                id: None,
                order_id: order_id.to_hex(),
                shipment_id,
                status: "Created".to_string(),
                created_at: DateTime::now(),
            };
            if let Err(e) = self.store.insert_shipment(&record).await {
                warn!("Could not record shipment {}: {}", shipment_id, e);
            }
        }

        info!("Payment verified: {}", checkout.razorpay_payment_id);
        Ok(Settled { order_id, shipment_id, remaining_stock })
    }

    async fn dispatch(
        &self,
        shipping: &dyn ShippingProvider,
        buyer: &Buyer,
        checkout: &VerifyPaymentInput,
        product: &Product,
        amount: i64,
        address: &str,
        pincode: &str,
    ) -> Option<i64> {
        let suffix: u16 = rand::thread_rng().gen_range(100..=999);
        let order = ShipmentOrder::prepaid(
            shipping.pickup_location(),
            Consignment {
                reference: format!("{}_{}", checkout.razorpay_order_id, suffix),
                customer_name: &buyer.name,
                customer_email: &buyer.email,
                address,
                pincode,
                item_name: &product.name,
                sku: product.id.map(|id| id.to_hex()).unwrap_or_else(|| checkout.product_id.clone()),
                units: checkout.quantity,
                unit_price: product.effective_price(),
                sub_total: amount as f64 / 100.0,
            },
        );

        match shipping.create_shipment(&order).await {
            Ok(Some(id)) => {
                info!("Shipment created: {}", id);
                Some(id)
            }
            Ok(None) => {
                warn!("Shipping provider accepted {} without a shipment id", order.order_id);
                None
            }
            Err(e) => {
                warn!("Shipment creation failed for {}: {}", order.order_id, e);
                None
            }
        }
    }

    /// Refunds the full recorded amount of a paid order.
    pub async fn refund(&self, order_id: ObjectId) -> Result<RefundOutcome, RefundError> {
        let order = self.store.find_order(order_id).await?.ok_or(RefundError::OrderNotFound)?;
        if order.status == OrderStatus::Refunded {
            return Ok(RefundOutcome::AlreadyRefunded);
        }
        let payment_id = order
            .payment_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(RefundError::MissingPaymentId)?;
        let gateway = self.gateway.ok_or(RefundError::GatewayUnavailable)?;

        info!("Initiating refund for payment {}", payment_id);
        let receipt = gateway
            .refund(payment_id, &RefundRequest::full(order.amount, REFUND_REASON))
            .await?;

        if !self.store.mark_refunded(order_id, &receipt.id, DateTime::now()).await? {
            warn!("Order {} changed while refund {} was issued", order_id, receipt.id);
        }
        Ok(RefundOutcome::Refunded { refund_id: receipt.id, amount: order.amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::testing::{sample_product, FakeGateway, FakeShipping, MemoryStore, GATEWAY_SECRET};

    fn buyer() -> Buyer {
        Buyer { email: "buyer@example.com".to_string(), name: "Buyer".to_string() }
    }

    fn checkout(product_id: &str, quantity: i64, signature: String) -> VerifyPaymentInput {
        VerifyPaymentInput {
            razorpay_order_id: "order_1".to_string(),
            razorpay_payment_id: "pay_1".to_string(),
            razorpay_signature: signature,
            product_id: product_id.to_string(),
            quantity,
            address: Some("4 Mill Lane".to_string()),
            pincode: Some("400001".to_string()),
            amount: 22000,
        }
    }

    fn valid_signature() -> String {
        crate::testing::sign(GATEWAY_SECRET, b"order_1|pay_1")
    }

    #[actix_web::test]
    async fn tampered_signature_changes_nothing() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Farmer, 3));
        let gateway = FakeGateway::default();
        let shipping = FakeShipping::succeeding(77);
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: Some(&shipping) };

        let mut tampered = valid_signature();
        tampered.replace_range(0..2, if tampered.starts_with("00") { "11" } else { "00" });
        let result = settlement.settle(&buyer(), &checkout(&product_id.to_hex(), 2, tampered)).await;

        assert!(matches!(result, Err(SettlementError::SignatureMismatch)));
        assert!(store.orders().is_empty());
        assert_eq!(store.product(product_id).unwrap().quantity, 3);
        assert_eq!(shipping.calls(), 0);
        assert_eq!(gateway.fetch_calls(), 0);
    }

    #[actix_web::test]
    async fn settles_order_and_decrements_stock() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Farmer, 3));
        let gateway = FakeGateway::with_method("upi");
        let shipping = FakeShipping::succeeding(77);
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: Some(&shipping) };

        let settled = settlement
            .settle(&buyer(), &checkout(&product_id.to_hex(), 2, valid_signature()))
            .await
            .unwrap();

        assert_eq!(settled.shipment_id, Some(77));
        assert_eq!(settled.remaining_stock, Some(1));
        assert_eq!(store.product(product_id).unwrap().quantity, 1);

        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.quantity, 2);
        assert_eq!(order.amount, 22000);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.delivery_status, "Processing");
        assert_eq!(order.payment_method, "UPI");
        assert_eq!(order.product_name, "Organic Rice");
        assert_eq!(order.shipment_id, Some(77));
        assert_eq!(store.shipments().len(), 1);

        let sent = shipping.last_order().unwrap();
        assert!(sent.order_id.starts_with("order_1_"));
        assert_eq!(sent.billing_pincode, "400001");
        assert_eq!(sent.order_items[0].units, 2);
        assert_eq!(sent.sub_total, 220.0);
    }

    #[actix_web::test]
    async fn stock_never_goes_negative() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Farmer, 1));
        let gateway = FakeGateway::default();
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: None };

        settlement
            .settle(&buyer(), &checkout(&product_id.to_hex(), 5, valid_signature()))
            .await
            .unwrap();
        assert_eq!(store.product(product_id).unwrap().quantity, 0);
    }

    #[actix_web::test]
    async fn missing_product_still_records_order() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let shipping = FakeShipping::succeeding(5);
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: Some(&shipping) };

        let settled = settlement
            .settle(&buyer(), &checkout(&ObjectId::new().to_hex(), 1, valid_signature()))
            .await
            .unwrap();

        assert_eq!(settled.shipment_id, None);
        assert_eq!(shipping.calls(), 0);
        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].product_name, "Unknown");
    }

    #[actix_web::test]
    async fn shipping_and_lookup_failures_degrade() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Business, 10));
        let gateway = FakeGateway::failing_lookups();
        let shipping = FakeShipping::failing();
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: Some(&shipping) };

        let settled = settlement
            .settle(&buyer(), &checkout(&product_id.to_hex(), 1, valid_signature()))
            .await
            .unwrap();

        assert_eq!(settled.shipment_id, None);
        assert_eq!(shipping.calls(), 1);
        let order = &store.orders()[0];
        assert_eq!(order.payment_method, "Razorpay");
        assert_eq!(order.shipment_id, None);
        assert!(store.shipments().is_empty());
        assert_eq!(store.product(product_id).unwrap().quantity, 9);
    }

    #[actix_web::test]
    async fn settlement_needs_a_gateway_and_positive_quantity() {
        let store = MemoryStore::default();
        let settlement = Settlement { store: &store, gateway: None, shipping: None };
        let result = settlement.settle(&buyer(), &checkout("x", 1, valid_signature())).await;
        assert!(matches!(result, Err(SettlementError::GatewayUnavailable)));

        let gateway = FakeGateway::default();
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: None };
        let result = settlement.settle(&buyer(), &checkout("x", 0, valid_signature())).await;
        assert!(matches!(result, Err(SettlementError::InvalidQuantity)));
        assert!(store.orders().is_empty());
    }

    #[actix_web::test]
    async fn non_positive_amount_is_rejected_before_side_effects() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Farmer, 3));
        let gateway = FakeGateway::default();
        let shipping = FakeShipping::succeeding(9);
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: Some(&shipping) };

        for amount in [0, -5_000_000] {
            let mut input = checkout(&product_id.to_hex(), 1, valid_signature());
            input.amount = amount;
            let result = settlement.settle(&buyer(), &input).await;
            assert!(matches!(result, Err(SettlementError::InvalidAmount)));
        }
        assert!(store.orders().is_empty());
        assert_eq!(store.product(product_id).unwrap().quantity, 3);
        assert_eq!(shipping.calls(), 0);
        assert_eq!(gateway.fetch_calls(), 0);
    }

    #[actix_web::test]
    async fn captured_amount_overrides_claimed_amount() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Farmer, 3));
        let gateway = FakeGateway::with_amount("card", 11000);
        let shipping = FakeShipping::succeeding(9);
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: Some(&shipping) };

        let mut input = checkout(&product_id.to_hex(), 1, valid_signature());
        input.amount = i64::MAX;
        settlement.settle(&buyer(), &input).await.unwrap();

        assert_eq!(store.orders()[0].amount, 11000);
        assert_eq!(shipping.last_order().unwrap().sub_total, 110.0);
    }

    #[actix_web::test]
    async fn refunds_full_amount_once() {
        let store = MemoryStore::default();
        let product_id = store.add_product(sample_product("seller@example.com", Role::Farmer, 3));
        let gateway = FakeGateway::default();
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: None };
        let settled = settlement
            .settle(&buyer(), &checkout(&product_id.to_hex(), 1, valid_signature()))
            .await
            .unwrap();

        let outcome = settlement.refund(settled.order_id).await.unwrap();
        assert_eq!(outcome, RefundOutcome::Refunded { refund_id: "rfnd_1".to_string(), amount: 22000 });
        assert_eq!(gateway.refunds(), vec![("pay_1".to_string(), 22000)]);

        let order = store.order(settled.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.refund_id.as_deref(), Some("rfnd_1"));
        assert!(order.refunded_at.is_some());
        assert_eq!(order.amount, 22000);

        let again = settlement.refund(settled.order_id).await.unwrap();
        assert_eq!(again, RefundOutcome::AlreadyRefunded);
        assert_eq!(gateway.refunds().len(), 1);
    }

    #[actix_web::test]
    async fn refund_preconditions() {
        let store = MemoryStore::default();
        let gateway = FakeGateway::default();
        let settlement = Settlement { store: &store, gateway: Some(&gateway), shipping: None };
        assert!(matches!(settlement.refund(ObjectId::new()).await, Err(RefundError::OrderNotFound)));

        let mut order = crate::testing::sample_order("buyer@example.com");
        order.payment_id = None;
        let order_id = store.add_order(order);
        assert!(matches!(settlement.refund(order_id).await, Err(RefundError::MissingPaymentId)));

        let order_id = store.add_order(crate::testing::sample_order("buyer@example.com"));
        let offline = Settlement { store: &store, gateway: None, shipping: None };
        assert!(matches!(offline.refund(order_id).await, Err(RefundError::GatewayUnavailable)));
        assert!(gateway.refunds().is_empty());
    }
}
