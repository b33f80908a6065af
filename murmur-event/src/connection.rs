use std::rc::Weak;
use std::sync::Weak as SyncWeak;

/// Identity of one callback registration.
///
/// An id is issued by `connect` and never reused by the
/// same registry, so it names at most one live callback
/// at any instant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CallbackId(u64);

impl CallbackId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Registry side of the disconnection capability for
/// single-threaded registries.
pub(crate) trait Disconnect {
    fn disconnect(&self, id: CallbackId);
}

/// Registry side of the disconnection capability for
/// thread-safe registries.
pub(crate) trait SyncDisconnect: Send + Sync {
    fn disconnect(&self, id: CallbackId);
}

/// Disconnection handle returned by `connect`.
///
/// The handle holds a weak link to its registry plus the
/// callback id, so disconnecting after the registry was
/// dropped is a no-op rather than an error. Clones share
/// the capability: the first `disconnect` on any clone
/// releases the callback, later calls find nothing left
/// to release.
#[derive(Clone, Default)]
pub struct Connection {
    link: Option<(Weak<dyn Disconnect>, CallbackId)>,
}

impl Connection {
    pub(crate) fn new(registry: Weak<dyn Disconnect>, id: CallbackId) -> Self {
        Self {
            link: Some((registry, id)),
        }
    }

    /// Whether this handle still carries a disconnection capability.
    pub fn is_live(&self) -> bool {
        self.link.is_some()
    }

    /// Release the referenced callback. Idempotent, and safe
    /// on a default-constructed handle or after the registry
    /// was destroyed.
    pub fn disconnect(&mut self) {
        if let Some((registry, id)) = self.link.take() {
            if let Some(registry) = registry.upgrade() {
                registry.disconnect(id);
            }
        }
    }
}

/// Connection that disconnects when dropped.
///
/// Move-only by construction. Useful for tying a callback's
/// lifetime to a scope.
#[derive(Default)]
#[must_use = "dropping a ScopedConnection disconnects its callback"]
pub struct ScopedConnection {
    connection: Connection,
}

impl ScopedConnection {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn is_live(&self) -> bool {
        self.connection.is_live()
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }
}

impl From<Connection> for ScopedConnection {
    fn from(connection: Connection) -> Self {
        Self::new(connection)
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}

/// [`Connection`] for the thread-safe registries.
///
/// Same contract as the single-threaded handle; split into
/// its own type because the weak link here must target a
/// `Send + Sync` registry, which makes the handle itself
/// free to cross threads.
#[derive(Clone, Default)]
pub struct SyncConnection {
    link: Option<(SyncWeak<dyn SyncDisconnect>, CallbackId)>,
}

impl SyncConnection {
    pub(crate) fn new(registry: SyncWeak<dyn SyncDisconnect>, id: CallbackId) -> Self {
        Self {
            link: Some((registry, id)),
        }
    }

    /// Whether this handle still carries a disconnection capability.
    pub fn is_live(&self) -> bool {
        self.link.is_some()
    }

    /// Release the referenced callback. Idempotent, and safe
    /// on a default-constructed handle or after the registry
    /// was destroyed.
    pub fn disconnect(&mut self) {
        if let Some((registry, id)) = self.link.take() {
            if let Some(registry) = registry.upgrade() {
                registry.disconnect(id);
            }
        }
    }
}

/// [`ScopedConnection`] for the thread-safe registries.
#[derive(Default)]
#[must_use = "dropping a SyncScopedConnection disconnects its callback"]
pub struct SyncScopedConnection {
    connection: SyncConnection,
}

impl SyncScopedConnection {
    pub fn new(connection: SyncConnection) -> Self {
        Self { connection }
    }

    pub fn is_live(&self) -> bool {
        self.connection.is_live()
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }
}

impl From<SyncConnection> for SyncScopedConnection {
    fn from(connection: SyncConnection) -> Self {
        Self::new(connection)
    }
}

impl Drop for SyncScopedConnection {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}
