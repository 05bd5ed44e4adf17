use std::ops::{Deref, DerefMut};
use crate::server::database::pool::Pool;

/// A client checked out of a [`Pool`].
pub(crate) struct Connection<C: Send + 'static> {
    client: Option<C>,
    pool: Pool<C>,
}

impl<C: Send + 'static> Connection<C> {
    pub fn new(client: C, pool: Pool<C>) -> Self {
        Self { client: Some(client), pool }
    }
}

impl<C: Send + 'static> Deref for Connection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        // only taken in drop
        self.client.as_ref().expect("connection used after release")
    }
}

impl<C: Send + 'static> DerefMut for Connection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.client.as_mut().expect("connection used after release")
    }
}

impl<C: Send + 'static> Drop for Connection<C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}
