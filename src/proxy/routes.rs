//! Proxied endpoints: local path under `/api/proxy`, accepted methods and the
//! backend path template they forward to.

use std::collections::HashMap;

use axum::http::Method;
use axum::routing::MethodFilter;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ProxyMethod {
    pub fn filter(self) -> MethodFilter {
        match self {
            ProxyMethod::Get => MethodFilter::GET,
            ProxyMethod::Post => MethodFilter::POST,
            ProxyMethod::Put => MethodFilter::PUT,
            ProxyMethod::Delete => MethodFilter::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProxyMethod::Get => "GET",
            ProxyMethod::Post => "POST",
            ProxyMethod::Put => "PUT",
            ProxyMethod::Delete => "DELETE",
        }
    }
}

/// Only POST and PUT forward a request body
pub fn carries_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT
}

#[derive(Debug, Clone, Serialize)]
pub struct ProxyRoute {
    /// axum path, `:name` captures
    pub path: &'static str,
    pub methods: &'static [ProxyMethod],
    /// backend path, `{name}` placeholders
    pub backend: &'static str,
}

use ProxyMethod::{Delete, Get, Post, Put};

pub static PROXY_ROUTES: &[ProxyRoute] = &[
    ProxyRoute {
        path: "/api/proxy/appointments",
        methods: &[Get, Post],
        backend: "/api/appointments",
    },
    ProxyRoute {
        path: "/api/proxy/admin/appointments",
        methods: &[Get],
        backend: "/api/admin/appointments",
    },
    ProxyRoute {
        path: "/api/proxy/admin/appointments/:id/approve",
        methods: &[Post],
        backend: "/api/admin/appointments/{id}/approve",
    },
    ProxyRoute {
        path: "/api/proxy/admin/appointments/:id/cancel",
        methods: &[Post],
        backend: "/api/admin/appointments/{id}/cancel",
    },
    ProxyRoute {
        path: "/api/proxy/admin/users",
        methods: &[Get, Post],
        backend: "/api/admin/users",
    },
    ProxyRoute {
        path: "/api/proxy/admin/users/:id",
        methods: &[Get, Put, Delete],
        backend: "/api/admin/users/{id}",
    },
    ProxyRoute {
        path: "/api/proxy/professions",
        methods: &[Get],
        backend: "/api/professions",
    },
    ProxyRoute {
        path: "/api/proxy/users/me",
        methods: &[Get, Put],
        backend: "/api/users/me",
    },
    ProxyRoute {
        path: "/api/proxy/users/me/schedule",
        methods: &[Get, Put],
        backend: "/api/users/me/schedule",
    },
    ProxyRoute {
        path: "/api/proxy/users/practitioners",
        methods: &[Get],
        backend: "/api/users/practitioners",
    },
    ProxyRoute {
        path: "/api/proxy/practitioner/appointments/:id/approve",
        methods: &[Post],
        backend: "/api/practitioner/appointments/{id}/approve",
    },
];

impl ProxyRoute {
    pub fn method_filter(&self) -> MethodFilter {
        self.methods
            .iter()
            .map(|m| m.filter())
            .reduce(MethodFilter::or)
            .unwrap_or(MethodFilter::GET)
    }

    /// Backend URL for this route. Each path parameter becomes exactly one
    /// percent-encoded segment; the inbound query string is kept as is.
    pub fn backend_url(
        &self,
        base: &Url,
        params: &HashMap<String, String>,
        query: Option<&str>,
    ) -> Result<Url, ApiError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::bad_gateway("BACKEND_URL cannot be used as a base URL"))?;
            segments.pop_if_empty();

            for part in self.backend.trim_start_matches('/').split('/') {
                match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    Some(name) => {
                        let value = params
                            .get(name)
                            .ok_or_else(|| ApiError::bad_gateway(format!("Missing path parameter '{}'", name)))?;
                        if value.is_empty() || value == "." || value == ".." {
                            return Err(ApiError::bad_gateway(format!("Invalid path parameter '{}'", name)));
                        }
                        segments.push(value);
                    }
                    None => {
                        segments.push(part);
                    }
                }
            }
        }
        url.set_query(query.filter(|q| !q.is_empty()));
        url.set_fragment(None);
        Ok(url)
    }
}
