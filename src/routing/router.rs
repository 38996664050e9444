//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for an exact (path, method) pair
//! - Tell "unknown path" apart from "known path, wrong method"
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) path lookup via HashMap, then a scan of that path's few methods
//! - Duplicate (path, method) pairs are an error, never overwritten

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::config::RouteConfig;
use crate::routing::entry::{RouteEntry, RouteError};

/// All routes registered for one path, in configuration order.
#[derive(Debug, Default)]
pub struct PathRoutes {
    entries: Vec<Arc<RouteEntry>>,
}

impl PathRoutes {
    /// Route registered for `method`, if any.
    pub fn get(&self, method: &Method) -> Option<&Arc<RouteEntry>> {
        self.entries.iter().find(|e| e.method() == method)
    }

    /// Value for an `Allow` header: the accepted methods joined by ", ".
    pub fn allow(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.method().as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    /// Exact path and method registered. `path` holds every route for the path.
    Matched {
        route: &'a Arc<RouteEntry>,
        path: &'a PathRoutes,
    },
    /// Path registered, but not for this method.
    MethodNotAllowed(&'a PathRoutes),
    /// No route for this path at all.
    NotFound,
}

impl<'a> RouteLookup<'a> {
    /// Routes registered for the looked-up path, if the path is known.
    pub fn path_routes(&self) -> Option<&'a PathRoutes> {
        match self {
            RouteLookup::Matched { path, .. } => Some(*path),
            RouteLookup::MethodNotAllowed(path) => Some(*path),
            RouteLookup::NotFound => None,
        }
    }
}

/// Exact-match route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    by_path: HashMap<String, PathRoutes>,
    len: usize,
}

impl RouteTable {
    /// Compile configured routes into a table.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        let entries = routes
            .iter()
            .map(RouteEntry::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(entries)
    }

    /// Build a table from already compiled entries, rejecting duplicates.
    pub fn build(entries: Vec<RouteEntry>) -> Result<Self, RouteError> {
        let mut table = Self::default();

        for entry in entries {
            let routes = table.by_path.entry(entry.path().to_string()).or_default();
            if routes.get(entry.method()).is_some() {
                return Err(RouteError::Duplicate {
                    path: entry.path().to_string(),
                    method: entry.method().to_string(),
                });
            }
            routes.entries.push(Arc::new(entry));
            table.len += 1;
        }

        Ok(table)
    }

    /// Resolve a request path and method.
    pub fn lookup(&self, path: &str, method: &Method) -> RouteLookup<'_> {
        match self.by_path.get(path) {
            None => RouteLookup::NotFound,
            Some(routes) => match routes.get(method) {
                Some(route) => RouteLookup::Matched {
                    route,
                    path: routes,
                },
                None => RouteLookup::MethodNotAllowed(routes),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over every compiled route.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.by_path.values().flat_map(|r| r.entries.iter())
    }
}
