//! Route groups.
//!
//! A [`RouteGroup`] is a cheap, cloneable handle to a path-prefix scope. Services
//! record routes, middleware and sub-groups on it during startup; once every
//! service is mounted the whole tree is frozen into one [`axum::Router`] with
//! [`RouteGroup::build`].
//!
//! Paths are absolute by the time they reach axum: a route registered as
//! `"/hi"` on a group based at `"/v1"` becomes `"/v1/hi"`. Path parameters use
//! axum syntax (`"/users/{id}"`).

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::Request;
use axum::handler::Handler;
use axum::response::IntoResponse;
use axum::routing::{self, MethodRouter, Route};
use axum::Router;
use tower::{Layer, Service};

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    fn next() -> Self {
        Self(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A registered route, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: String,
}

type ApplyLayer = Arc<dyn Fn(Router) -> Router + Send + Sync>;

struct RouteEntry {
    method: &'static str,
    path: String,
    endpoint: MethodRouter,
}

#[derive(Default)]
struct GroupState {
    routes: Vec<RouteEntry>,
    merged: Vec<Router>,
    layers: Vec<ApplyLayer>,
    children: Vec<RouteGroup>,
}

struct GroupInner {
    id: GroupId,
    base_path: String,
    state: Mutex<GroupState>,
}

/// Handle to a path-prefix scope owning routes, middleware and sub-groups.
#[derive(Clone)]
pub struct RouteGroup {
    inner: Arc<GroupInner>,
}

impl RouteGroup {
    /// The root scope, based at `/`.
    pub fn root() -> Self {
        Self::with_base_path("/".to_string())
    }

    fn with_base_path(base_path: String) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                id: GroupId::next(),
                base_path,
                state: Mutex::new(GroupState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GroupState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> GroupId {
        self.inner.id
    }

    /// Absolute path prefix of this group.
    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    /// Whether `other` is this group or one of its descendants.
    pub fn contains(&self, other: &RouteGroup) -> bool {
        if self == other {
            return true;
        }
        let children = self.state().children.clone();
        children.iter().any(|child| child.contains(other))
    }

    /// Derive a sub-group scoped to `relative_path` under this group.
    pub fn group(&self, relative_path: &str) -> RouteGroup {
        let child = Self::with_base_path(join_paths(self.base_path(), relative_path));
        self.state().children.push(child.clone());
        child
    }

    /// Register a method router at `path`, relative to this group.
    pub fn route(&self, path: &str, endpoint: MethodRouter) -> &Self {
        self.push_route("ANY", path, endpoint)
    }

    pub fn get<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.push_route("GET", path, routing::get(handler))
    }

    pub fn post<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.push_route("POST", path, routing::post(handler))
    }

    pub fn put<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.push_route("PUT", path, routing::put(handler))
    }

    pub fn patch<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.push_route("PATCH", path, routing::patch(handler))
    }

    pub fn delete<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.push_route("DELETE", path, routing::delete(handler))
    }

    /// Merge a fully built router, e.g. one carrying its own state.
    ///
    /// The router's paths are taken as-is; they are not prefixed.
    pub fn merge(&self, router: Router) -> &Self {
        self.state().merged.push(router);
        self
    }

    /// Attach middleware to this group and everything beneath it.
    ///
    /// The first layer attached is the outermost.
    pub fn layer<L>(&self, layer: L) -> &Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        let apply: ApplyLayer = Arc::new(move |router: Router| router.layer(layer.clone()));
        self.state().layers.push(apply);
        self
    }

    fn push_route(&self, method: &'static str, path: &str, endpoint: MethodRouter) -> &Self {
        let path = join_paths(self.base_path(), path);
        self.state().routes.push(RouteEntry {
            method,
            path,
            endpoint,
        });
        self
    }

    /// Every route registered on this group and its sub-groups.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let state = self.state();
        let mut routes: Vec<RouteInfo> = state
            .routes
            .iter()
            .map(|entry| RouteInfo {
                method: entry.method,
                path: entry.path.clone(),
            })
            .collect();
        for child in &state.children {
            routes.extend(child.routes());
        }
        routes
    }

    /// Freeze this group and its sub-tree into a router.
    ///
    /// Panics, like axum itself, when two routes claim the same method and path.
    pub fn build(&self) -> Router {
        let state = self.state();
        let mut router = Router::new();

        for entry in &state.routes {
            router = router.route(&entry.path, entry.endpoint.clone());
        }
        for merged in &state.merged {
            router = router.merge(merged.clone());
        }
        for child in &state.children {
            router = router.merge(child.build());
        }
        for apply in state.layers.iter().rev() {
            router = apply(router);
        }

        router
    }
}

impl PartialEq for RouteGroup {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RouteGroup {}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("id", &self.inner.id)
            .field("base_path", &self.inner.base_path)
            .finish()
    }
}

/// Join a relative path onto an absolute base.
///
/// The result is cleaned (no empty or `.` segments, `..` pops) and keeps a
/// trailing slash when `relative` has one.
pub fn join_paths(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return clean_path(base);
    }

    let mut joined = clean_path(&format!("{}/{}", base, relative));
    if relative.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}
