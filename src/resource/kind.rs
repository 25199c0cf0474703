//! Resource kinds
//!
//! The closed set of resource kinds the engine understands, with the
//! per-kind facts the rest of the crate needs (parent kind, pagination
//! protocol, name of the wrapped payload on the wire).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote listing protocol used by a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `page[size]` / `page[number]`
    PageNumber,
    /// `page[size]` / `page[after]`, next pointer carried in `meta.page.next`
    Cursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Portal,
    PortalPage,
    Api,
    ApiVersion,
    ApiPublication,
    ControlPlane,
    GatewayService,
    ApplicationAuthStrategy,
    Team,
    EventGateway,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Portal,
        ResourceKind::PortalPage,
        ResourceKind::Api,
        ResourceKind::ApiVersion,
        ResourceKind::ApiPublication,
        ResourceKind::ControlPlane,
        ResourceKind::GatewayService,
        ResourceKind::ApplicationAuthStrategy,
        ResourceKind::Team,
        ResourceKind::EventGateway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Portal => "portal",
            ResourceKind::PortalPage => "portal_page",
            ResourceKind::Api => "api",
            ResourceKind::ApiVersion => "api_version",
            ResourceKind::ApiPublication => "api_publication",
            ResourceKind::ControlPlane => "control_plane",
            ResourceKind::GatewayService => "gateway_service",
            ResourceKind::ApplicationAuthStrategy => "application_auth_strategy",
            ResourceKind::Team => "team",
            ResourceKind::EventGateway => "event_gateway",
        }
    }

    /// Kind that owns resources of this kind, if any.
    pub fn parent(&self) -> Option<ResourceKind> {
        match self {
            ResourceKind::PortalPage => Some(ResourceKind::Portal),
            ResourceKind::ApiVersion | ResourceKind::ApiPublication => Some(ResourceKind::Api),
            ResourceKind::GatewayService => Some(ResourceKind::ControlPlane),
            _ => None,
        }
    }

    pub fn pagination(&self) -> PaginationStyle {
        match self {
            ResourceKind::EventGateway => PaginationStyle::Cursor,
            _ => PaginationStyle::PageNumber,
        }
    }

    /// Name of the object some list endpoints wrap their payload in.
    pub fn embedded_field(&self) -> Option<&'static str> {
        match self {
            ResourceKind::EventGateway => Some("eventGatewayInfo"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}
