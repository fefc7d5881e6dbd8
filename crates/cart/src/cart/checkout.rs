//! Turning the cart into an order.

use tracing::{error, info, instrument};

use petshop_core::{OrderStatus, UserId};

use super::coordinator::SyncCoordinator;
use crate::error::CartError;
use crate::models::{Order, OrderDraft};
use crate::remote::OrderSubmission;

impl SyncCoordinator {
    /// Submit the current cart as an order for `user_id`.
    ///
    /// On success both cart layers are cleared and the created order is
    /// returned. On failure the cart is left exactly as it was; there is no
    /// retry.
    ///
    /// Lines added while the submission is in flight are cleared along with
    /// the submitted ones.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a blank user id or an empty cart.
    /// Returns `CartError::Remote` if the order service rejects the order.
    #[instrument(skip(self, orders), fields(user_id = %user_id))]
    pub async fn checkout(
        &self,
        user_id: &UserId,
        orders: &dyn OrderSubmission,
    ) -> Result<Order, CartError> {
        if user_id.is_blank() {
            return Err(CartError::Validation(
                "sign in to place an order".to_string(),
            ));
        }

        let draft = self.with_state(|state| {
            (!state.items().is_empty()).then(|| OrderDraft {
                user_id: user_id.clone(),
                items: state.items().to_vec(),
                total_amount: state.total_amount(),
                status: OrderStatus::Processing,
            })
        });
        let Some(draft) = draft else {
            return Err(CartError::Validation("cart is empty".to_string()));
        };

        match orders.submit_order(draft).await {
            Ok(order) => {
                info!(
                    order_id = %order.id,
                    total = %order.total_amount,
                    items = order.item_count(),
                    "Order placed"
                );
                self.clear_and_sync().await;
                Ok(order)
            }
            Err(e) => {
                error!(error = %e, "Order submission failed");
                Err(CartError::Remote(e))
            }
        }
    }
}
