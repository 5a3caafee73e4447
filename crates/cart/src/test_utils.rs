//! In-memory cart service for exercising the core without HTTP.

use core::time::Duration;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use storefront_client::{CartApi, ClientError};
use storefront_primitives::cart::{
    Cart, CartLineItem, CartToken, LineKey, LineRef, ProductId, VariantId,
};
use storefront_primitives::requests::{AddItem, UpdateRequest};
use tokio::time;

use crate::context::CartContext;
use crate::settings::CartSettings;

pub const LOCAL: &str = "local";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Read,
    Add(Vec<AddItem>),
    Change(LineRef, u32),
    Update(UpdateRequest),
}

impl Call {
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

#[derive(Debug, Default)]
struct State {
    carts: HashMap<CartToken, Cart>,
    caps: HashMap<VariantId, u32>,
    products: HashMap<VariantId, ProductId>,
    next_key: u64,
    calls: Vec<Call>,
    failures: VecDeque<ClientError>,
    delay: Duration,
}

/// Scripted cart service.
///
/// Mutations are applied as soon as the call starts; the configured delay
/// only holds back the response, like a slow network would.
#[derive(Debug)]
pub struct ScriptedCart {
    state: Mutex<State>,
    identity: Mutex<Option<CartToken>>,
}

impl ScriptedCart {
    pub fn new() -> Arc<Self> {
        let scripted = Self {
            state: Mutex::default(),
            identity: Mutex::new(Some(token(LOCAL))),
        };
        scripted.insert_cart(LOCAL, &[]);

        Arc::new(scripted)
    }

    pub fn with_lines(lines: &[(u64, u32)]) -> Arc<Self> {
        let scripted = Self::new();
        scripted.insert_cart(LOCAL, lines);
        scripted
    }

    pub fn context(self: &Arc<Self>) -> CartContext {
        CartContext::new(Arc::clone(self) as Arc<dyn CartApi>, CartSettings::default())
    }

    pub fn insert_cart(&self, cart_token: &str, lines: &[(u64, u32)]) {
        let mut state = self.state.lock();

        let mut cart = Cart {
            token: token(cart_token),
            ..Cart::default()
        };

        for &(variant_id, quantity) in lines {
            let item = state.new_line(VariantId::new(variant_id), quantity);
            cart.items.push(item);
        }
        cart.item_count = cart.items.iter().map(|item| item.quantity).sum();

        let _previous = state.carts.insert(token(cart_token), cart);
    }

    pub fn set_cap(&self, variant_id: u64, max: u32) {
        let _previous = self.state.lock().caps.insert(VariantId::new(variant_id), max);
    }

    pub fn set_product(&self, variant_id: u64, product_id: u64) {
        let _previous = self
            .state
            .lock()
            .products
            .insert(VariantId::new(variant_id), ProductId::new(product_id));
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = delay;
    }

    pub fn fail_next(&self, err: ClientError) {
        self.state.lock().failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn reads(&self) -> usize {
        self.calls().iter().filter(|call| **call == Call::Read).count()
    }

    pub fn cart(&self, cart_token: &str) -> Cart {
        self.state
            .lock()
            .carts
            .get(&token(cart_token))
            .cloned()
            .unwrap_or_default()
    }

    pub fn quantity(&self, cart_token: &str, variant_id: u64) -> u32 {
        self.cart(cart_token).quantity_of(VariantId::new(variant_id))
    }

    async fn respond(
        &self,
        call: Call,
        apply: impl FnOnce(&mut State, &mut Cart) -> Result<(), ClientError>,
    ) -> Result<Cart, ClientError> {
        let identity = self.identity.lock().clone().unwrap_or_default();

        let (result, delay) = {
            let mut state = self.state.lock();
            state.calls.push(call);

            let result = match state.failures.pop_front() {
                Some(err) => Err(err),
                None => state.apply(&identity, apply),
            };

            (result, state.delay)
        };

        if !delay.is_zero() {
            time::sleep(delay).await;
        }

        result
    }
}

impl State {
    fn new_line(&mut self, variant_id: VariantId, quantity: u32) -> CartLineItem {
        self.next_key += 1;

        CartLineItem {
            key: LineKey::from(format!("{variant_id}:{}", self.next_key)),
            variant_id,
            product_id: self.products.get(&variant_id).copied(),
            quantity,
        }
    }

    fn apply(
        &mut self,
        identity: &CartToken,
        apply: impl FnOnce(&mut Self, &mut Cart) -> Result<(), ClientError>,
    ) -> Result<Cart, ClientError> {
        let Some(mut cart) = self.carts.get(identity).cloned() else {
            // unknown identities resolve to nothing
            return Ok(Cart::default());
        };

        apply(self, &mut cart)?;

        cart.items.retain(|item| item.quantity > 0);
        cart.item_count = cart.items.iter().map(|item| item.quantity).sum();

        let _previous = self.carts.insert(identity.clone(), cart.clone());

        Ok(cart)
    }

    fn check_cap(&self, variant_id: VariantId, quantity: u32) -> Result<(), ClientError> {
        match self.caps.get(&variant_id) {
            Some(&max) if quantity > max => Err(ClientError::Rejected {
                status: 422,
                message: "Cart Error".to_owned(),
                description: Some(format!("You can only add {max} of this item to your cart.")),
            }),
            _ => Ok(()),
        }
    }

    fn set_quantity(
        &mut self,
        cart: &mut Cart,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        self.check_cap(variant_id, quantity)?;

        match cart.items.iter_mut().find(|item| item.variant_id == variant_id) {
            Some(item) => item.quantity = quantity,
            None if quantity > 0 => cart.items.push(self.new_line(variant_id, quantity)),
            None => {}
        }

        Ok(())
    }
}

#[async_trait]
impl CartApi for ScriptedCart {
    async fn read(&self) -> Result<Cart, ClientError> {
        self.respond(Call::Read, |_, _| Ok(())).await
    }

    async fn add(&self, items: &[AddItem]) -> Result<Cart, ClientError> {
        self.respond(Call::Add(items.to_vec()), |state, cart| {
            for item in items {
                let quantity = cart.quantity_of(item.id) + item.quantity;
                state.set_quantity(cart, item.id, quantity)?;
            }
            Ok(())
        })
        .await
    }

    async fn change(&self, line: &LineRef, quantity: u32) -> Result<Cart, ClientError> {
        self.respond(Call::Change(line.clone(), quantity), |state, cart| {
            let variant_id = match line {
                LineRef::Key(key) => cart.line_by_key(key).map(|item| item.variant_id),
                LineRef::Variant(variant_id) => {
                    cart.line_for_variant(*variant_id).map(|item| item.variant_id)
                }
            };

            let Some(variant_id) = variant_id else {
                return Err(ClientError::Rejected {
                    status: 400,
                    message: "no valid id/line option provided".to_owned(),
                    description: None,
                });
            };

            state.set_quantity(cart, variant_id, quantity)
        })
        .await
    }

    async fn update(&self, request: &UpdateRequest) -> Result<Cart, ClientError> {
        self.respond(Call::Update(request.clone()), |state, cart| {
            for (&variant_id, &quantity) in &request.updates {
                state.set_quantity(cart, variant_id, quantity)?;
            }

            if let Some(note) = &request.note {
                cart.note = (!note.is_empty()).then(|| note.clone());
            }

            Ok(())
        })
        .await
    }

    fn identity(&self) -> Option<CartToken> {
        self.identity.lock().clone()
    }

    fn set_identity(&self, token: Option<CartToken>) -> Option<CartToken> {
        core::mem::replace(&mut *self.identity.lock(), token)
    }
}

pub fn token(value: &str) -> CartToken {
    CartToken::from(value)
}

pub fn lines(cart: &Cart) -> BTreeMap<u64, u32> {
    cart.items
        .iter()
        .map(|item| (item.variant_id.get(), item.quantity))
        .collect()
}
