//! Liveness guards for pending requests.
//!
//! An adapter future settles some time after the request was issued. By then
//! the store may have been torn down or the record that asked may have been
//! unloaded. [`guard`] wraps the future so that its outcome is only forwarded
//! while the target is still alive; otherwise the derived future never
//! completes and nothing downstream runs.

use futures::future;

use crate::BoxFut;

/// Something that can be torn down while a request is in flight.
pub trait Alive {
    fn is_alive(&self) -> bool;
}

impl<T: Alive + ?Sized> Alive for std::sync::Arc<T> {
    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

/// Forward `pending`'s outcome only if `target` is still alive when it settles.
///
/// Guards compose: `guard(guard(f, store), record)` requires both to survive.
pub fn guard<T, A>(pending: BoxFut<'static, T>, target: A) -> BoxFut<'static, T>
where
    T: Send + 'static,
    A: Alive + Send + 'static,
{
    Box::pin(async move {
        let outcome = pending.await;
        if !target.is_alive() {
            tracing::debug!("target destroyed before request settled, abandoning continuation");
            return future::pending::<T>().await;
        }
        outcome
    })
}
