//! The store controller: single owner of catalog and cart state.
//!
//! Commands go in over an `mpsc` channel, state snapshots come out over a
//! `watch` channel. The controller task also watches the session channel and
//! refetches catalog and cart on every session change.
//!
//! Mutations are optimistic: local state updates immediately and the remote
//! write is spawned fire-and-forget. A failed cart write marks the affected
//! entry [`SyncState::Unsynced`] and is logged; local state is never rolled
//! back, and the divergence heals on the next full refetch. Overlapping
//! writes on the same row have no ordering guarantee - last response wins.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use quitanda_core::{CustomerId, Price, ProductId};

use crate::cart;
use crate::error::{FetchError, FetchTarget, MutationError, PermissionError, StoreError};
use crate::models::{
    AggregatedCartItem, CartEntry, CartRow, Identity, NewProduct, Product, ProductPatch, Session,
    SyncState,
};
use crate::order::{Order, OrderStore, PaymentMethod};
use crate::remote::{RemoteError, TableClient};
use crate::session::SessionService;

const COMMAND_BUFFER: usize = 64;

/// A mutation request for the controller.
#[derive(Debug, Clone)]
pub enum Command {
    /// Add one unit of a product to the cart.
    AddToCart(Product),
    /// Remove one unit; the line is deleted when it would reach zero.
    RemoveFromCart(ProductId),
    /// Set an absolute quantity; zero or less deletes the line.
    UpdateQty(ProductId, i64),
    /// Delete one product's line outright, whatever its quantity.
    ClearCart(ProductId),
    /// Admin: create a catalog product.
    AddProduct(NewProduct),
    /// Admin: edit a catalog product.
    UpdateProduct(ProductId, ProductPatch),
    /// Admin: delete a catalog product.
    RemoveProduct(ProductId),
    /// Freeze the cart into the last-order record and empty it.
    Checkout {
        customer_name: String,
        payment_method: PaymentMethod,
    },
    /// Reload catalog and cart from the remote.
    Refetch,
}

/// A point-in-time copy of the controller's state.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub products: Vec<Product>,
    pub cart: Vec<CartEntry>,
    pub loading: bool,
    pub error: Option<String>,
    pub identity: Identity,
    /// Number of commands the controller has finished handling. Lets a
    /// caller tell its own command's effect apart from the state it sent
    /// the command against.
    pub handled: u64,
    /// Remote cart writes still in flight.
    pub pending_writes: u32,
}

impl StoreSnapshot {
    /// The aggregated per-product cart view. Recomputed on every call.
    #[must_use]
    pub fn aggregated(&self) -> Vec<AggregatedCartItem> {
        cart::aggregate(&self.cart)
    }

    /// Total of the aggregated cart.
    #[must_use]
    pub fn total(&self) -> Price {
        cart::cart_total(&self.aggregated())
    }
}

/// Result of a spawned remote write, reported back to the controller.
#[derive(Debug)]
enum WriteOutcome {
    Cart {
        product_id: ProductId,
        result: Result<(), RemoteError>,
    },
    Catalog {
        product_id: ProductId,
        result: Result<(), RemoteError>,
    },
}

/// The remote half of a cart mutation.
#[derive(Debug)]
enum CartWrite {
    /// Increment the remote row (read-modify-write), inserting at 1 if
    /// absent.
    Add(Product),
    /// Set the remote row's absolute quantity.
    SetQuantity(i64),
    /// Delete the remote row.
    Delete,
}

/// Credentials for remote writes, snapshot at command time.
#[derive(Clone)]
struct Writer {
    token: SecretString,
    customer_id: CustomerId,
}

/// Cloneable handle to a running [`StoreController`].
#[derive(Clone)]
pub struct StoreHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<StoreSnapshot>,
}

impl StoreHandle {
    /// Send a command to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ControllerClosed`] if the controller task is
    /// gone.
    pub async fn send(&self, command: Command) -> Result<(), StoreError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| StoreError::ControllerClosed)
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ControllerClosed`] if the controller task is
    /// gone.
    pub async fn wait_until<F>(&self, predicate: F) -> Result<StoreSnapshot, StoreError>
    where
        F: Fn(&StoreSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&snapshot) {
                    return Ok(snapshot.clone());
                }
            }
            rx.changed()
                .await
                .map_err(|_| StoreError::ControllerClosed)?;
        }
    }

    /// Wait until loading is done and no cart write is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ControllerClosed`] if the controller task is
    /// gone.
    pub async fn settled(&self) -> Result<StoreSnapshot, StoreError> {
        self.wait_until(|s| !s.loading && s.pending_writes == 0).await
    }

    /// Send a command and wait for it to be handled and its remote writes
    /// to resolve. The returned snapshot reflects the command's effect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ControllerClosed`] if the controller task is
    /// gone.
    pub async fn execute(&self, command: Command) -> Result<StoreSnapshot, StoreError> {
        let sent_at = self.snapshots.borrow().handled;
        self.send(command).await?;
        self.wait_until(|s| s.handled > sent_at && !s.loading && s.pending_writes == 0)
            .await
    }
}

/// Single owner of catalog and cart state.
pub struct StoreController {
    tables: TableClient,
    order_store: OrderStore,
    session_rx: watch::Receiver<Option<Session>>,
    commands: mpsc::Receiver<Command>,
    outcome_tx: mpsc::Sender<WriteOutcome>,
    outcome_rx: mpsc::Receiver<WriteOutcome>,
    snapshot_tx: watch::Sender<StoreSnapshot>,

    session: Option<Session>,
    identity: Identity,
    products: Vec<Product>,
    cart: Vec<CartEntry>,
    loading: bool,
    error: Option<String>,
    handled: u64,
    pending_writes: u32,
}

impl StoreController {
    /// Spawn a controller subscribed to the given session service.
    #[must_use]
    pub fn spawn(
        tables: TableClient,
        sessions: &SessionService,
        order_store: OrderStore,
    ) -> StoreHandle {
        Self::spawn_with(tables, sessions.subscribe(), order_store)
    }

    /// Spawn a controller on an explicit session channel.
    #[must_use]
    pub fn spawn_with(
        tables: TableClient,
        session_rx: watch::Receiver<Option<Session>>,
        order_store: OrderStore,
    ) -> StoreHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (outcome_tx, outcome_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshots) = watch::channel(StoreSnapshot {
            loading: true,
            ..StoreSnapshot::default()
        });

        let controller = Self {
            tables,
            order_store,
            session_rx,
            commands,
            outcome_tx,
            outcome_rx,
            snapshot_tx,
            session: None,
            identity: Identity::Anonymous,
            products: Vec::new(),
            cart: Vec::new(),
            loading: true,
            error: None,
            handled: 0,
            pending_writes: 0,
        };
        tokio::spawn(controller.run());

        StoreHandle {
            commands: command_tx,
            snapshots,
        }
    }

    /// Run the controller loop until every command sender is dropped.
    async fn run(mut self) {
        // Initial load for whatever session is already established.
        self.sync_session();
        self.reload().await;
        self.publish();

        loop {
            tokio::select! {
                changed = self.session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.sync_session();
                    self.reload().await;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command).await;
                    self.handled += 1;
                }
                Some(outcome) = self.outcome_rx.recv() => {
                    self.apply_outcome(outcome);
                }
            }
            self.publish();
        }
        debug!("store controller stopping");
    }

    /// Pick up the current session and fix the identity for its lifetime.
    fn sync_session(&mut self) {
        self.session = self.session_rx.borrow_and_update().clone();
        self.identity = Identity::from_session(self.session.as_ref());
        info!(identity = %self.identity.display_name(), "session changed");
    }

    /// Full refetch: catalog always, cart when signed in. Fetch errors keep
    /// the prior state and set the visible error flag.
    #[instrument(skip(self))]
    async fn reload(&mut self) {
        self.loading = true;
        self.error = None;
        self.publish();

        match self.tables.list_products().await {
            Ok(products) => self.products = products,
            Err(e) => self.set_fetch_error(FetchTarget::Catalog, e),
        }

        match (&self.session, self.identity.customer_id()) {
            (Some(session), Some(customer_id)) => {
                match self
                    .tables
                    .cart_rows(session.access_token.expose_secret(), customer_id)
                    .await
                {
                    Ok(rows) => self.cart = rows.into_iter().map(CartEntry::synced).collect(),
                    Err(e) => self.set_fetch_error(FetchTarget::Cart, e),
                }
            }
            _ => self.cart.clear(),
        }

        self.loading = false;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::AddToCart(product) => self.add_to_cart(product),
            Command::RemoveFromCart(product_id) => self.remove_from_cart(product_id),
            Command::UpdateQty(product_id, qty) => self.update_qty(product_id, qty),
            Command::ClearCart(product_id) => self.clear_cart(product_id),
            Command::AddProduct(new) => self.add_product(new).await,
            Command::UpdateProduct(product_id, patch) => self.update_product(product_id, patch),
            Command::RemoveProduct(product_id) => self.remove_product(product_id),
            Command::Checkout {
                customer_name,
                payment_method,
            } => self.checkout(customer_name, payment_method),
            Command::Refetch => self.reload().await,
        }
    }

    // =========================================================================
    // Cart mutations (optimistic local, fire-and-forget remote)
    // =========================================================================

    fn add_to_cart(&mut self, product: Product) {
        let quantity = cart::apply_add(&mut self.cart, self.identity.customer_id(), &product);
        debug!(product_id = %product.id, quantity, "added to cart");
        let product_id = product.id;
        self.spawn_cart_write(product_id, CartWrite::Add(product));
    }

    fn remove_from_cart(&mut self, product_id: ProductId) {
        let Some(new_qty) = cart::apply_remove(&mut self.cart, product_id) else {
            return;
        };
        let write = if new_qty > 0 {
            CartWrite::SetQuantity(new_qty)
        } else {
            CartWrite::Delete
        };
        self.spawn_cart_write(product_id, write);
    }

    fn update_qty(&mut self, product_id: ProductId, qty: i64) {
        if !cart::apply_set_qty(&mut self.cart, product_id, qty) {
            debug!(%product_id, "update_qty for product not in cart, ignoring");
            return;
        }
        let write = if qty > 0 {
            CartWrite::SetQuantity(qty)
        } else {
            CartWrite::Delete
        };
        self.spawn_cart_write(product_id, write);
    }

    fn clear_cart(&mut self, product_id: ProductId) {
        if !cart::apply_clear(&mut self.cart, product_id) {
            return;
        }
        self.spawn_cart_write(product_id, CartWrite::Delete);
    }

    /// Spawn the remote half of a cart mutation. Anonymous visitors have no
    /// remote cart, so the local update stands alone.
    fn spawn_cart_write(&mut self, product_id: ProductId, write: CartWrite) {
        let Some(writer) = self.writer() else {
            return;
        };
        cart::mark(&mut self.cart, product_id, SyncState::Pending);
        self.pending_writes += 1;

        let tables = self.tables.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = write.run(&tables, &writer, product_id).await;
            let _ = outcome_tx
                .send(WriteOutcome::Cart { product_id, result })
                .await;
        });
    }

    fn apply_outcome(&mut self, outcome: WriteOutcome) {
        self.pending_writes = self.pending_writes.saturating_sub(1);
        match outcome {
            WriteOutcome::Cart { product_id, result } => match result {
                Ok(()) => cart::mark(&mut self.cart, product_id, SyncState::Synced),
                Err(e) => {
                    let err = MutationError::new(product_id, e);
                    warn!(error = %err, "cart write failed, local state is ahead of remote");
                    cart::mark(&mut self.cart, product_id, SyncState::Unsynced);
                }
            },
            WriteOutcome::Catalog { product_id, result } => {
                if let Err(e) = result {
                    let err = MutationError::new(product_id, e);
                    warn!(error = %err, "catalog write failed, local state is ahead of remote");
                }
            }
        }
    }

    // =========================================================================
    // Admin catalog mutations
    // =========================================================================

    async fn add_product(&mut self, new: NewProduct) {
        let Some(token) = self.require_admin("add products") else {
            return;
        };
        // Waits for the representation so the remote-assigned id lands in
        // the snapshot.
        match self.tables.insert_product(token.expose_secret(), &new).await {
            Ok(product) => {
                info!(product_id = %product.id, "product added");
                self.error = None;
                self.products.push(product);
            }
            Err(e) => {
                warn!(error = %e, "product insert failed");
                self.error = Some(format!("failed to add product: {e}"));
            }
        }
    }

    fn update_product(&mut self, product_id: ProductId, patch: ProductPatch) {
        let Some(token) = self.require_admin("edit products") else {
            return;
        };
        let Some(product) = self.products.iter_mut().find(|p| p.id == product_id) else {
            self.error = Some(format!("no such product: {product_id}"));
            return;
        };
        patch.apply_to(product);
        self.error = None;
        self.pending_writes += 1;

        let tables = self.tables.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = tables
                .update_product(token.expose_secret(), product_id, &patch)
                .await;
            let _ = outcome_tx
                .send(WriteOutcome::Catalog { product_id, result })
                .await;
        });
    }

    fn remove_product(&mut self, product_id: ProductId) {
        let Some(token) = self.require_admin("remove products") else {
            return;
        };
        self.products.retain(|p| p.id != product_id);
        self.error = None;
        self.pending_writes += 1;

        let tables = self.tables.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = tables.delete_product(token.expose_secret(), product_id).await;
            let _ = outcome_tx
                .send(WriteOutcome::Catalog { product_id, result })
                .await;
        });
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    fn checkout(&mut self, customer_name: String, payment_method: PaymentMethod) {
        let items = cart::aggregate(&self.cart);
        if items.is_empty() {
            self.error = Some("cannot check out an empty cart".to_string());
            return;
        }

        let product_ids: Vec<ProductId> = items.iter().map(|item| item.id).collect();
        let order = Order::place(customer_name, payment_method, items);
        if let Err(e) = self.order_store.save(&order) {
            warn!(error = %e, "failed to write last-order record");
            self.error = Some(format!("failed to record order: {e}"));
            return;
        }
        info!(total = %order.total, "order placed");

        self.cart.clear();
        self.error = None;
        for product_id in product_ids {
            self.spawn_cart_write(product_id, CartWrite::Delete);
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Admin gate: on failure sets the visible error and yields nothing, so
    /// no local or remote mutation happens.
    fn require_admin(&mut self, action: &'static str) -> Option<SecretString> {
        if self.identity.is_admin() {
            self.session.as_ref().map(|s| s.access_token.clone())
        } else {
            let err = PermissionError::new(action);
            warn!(identity = %self.identity.display_name(), %err, "admin mutation denied");
            self.error = Some(err.to_string());
            None
        }
    }

    fn writer(&self) -> Option<Writer> {
        let session = self.session.as_ref()?;
        Some(Writer {
            token: session.access_token.clone(),
            customer_id: self.identity.customer_id()?,
        })
    }

    fn set_fetch_error(&mut self, target: FetchTarget, source: RemoteError) {
        let err = FetchError::new(target, source);
        warn!(error = %err, "fetch failed, keeping prior state");
        self.error = Some(err.to_string());
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(StoreSnapshot {
            products: self.products.clone(),
            cart: self.cart.clone(),
            loading: self.loading,
            error: self.error.clone(),
            identity: self.identity.clone(),
            handled: self.handled,
            pending_writes: self.pending_writes,
        });
    }
}

impl CartWrite {
    async fn run(
        self,
        tables: &TableClient,
        writer: &Writer,
        product_id: ProductId,
    ) -> Result<(), RemoteError> {
        match self {
            // Read-modify-write: two racing adds can lose an increment,
            // last response wins.
            Self::Add(product) => {
                let token = writer.token.expose_secret();
                match tables
                    .find_cart_row(token, writer.customer_id, product_id)
                    .await?
                {
                    Some(existing) => {
                        tables
                            .set_cart_row_quantity(
                                token,
                                writer.customer_id,
                                product_id,
                                existing.quantity + 1,
                            )
                            .await
                    }
                    None => {
                        let row = CartRow::first_of(Some(writer.customer_id), &product);
                        tables.insert_cart_row(token, &row).await
                    }
                }
            }
            Self::SetQuantity(qty) => {
                tables
                    .set_cart_row_quantity(
                        writer.token.expose_secret(),
                        writer.customer_id,
                        product_id,
                        qty,
                    )
                    .await
            }
            Self::Delete => {
                tables
                    .delete_cart_row(writer.token.expose_secret(), writer.customer_id, product_id)
                    .await
            }
        }
    }
}
