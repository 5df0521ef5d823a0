//! View-layer branching on the access snapshot.
//!
//! SYSTEM CONTEXT
//! ==============
//! Front ends never decide access themselves. They pick a rendering branch
//! from the snapshot: login gate, client dashboard, or the admin console with
//! its navigation catalogue.

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;

use serde::Serialize;

use crate::access::{AccessSnapshot, AuthorizedClient};

pub const APP_TITLE: &str = "Mission Control";

/// Top-level branch a front end should render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum ViewBranch {
    Loading,
    LoginGate,
    ClientDashboard { organization_name: String },
    AdminConsole,
}

impl ViewBranch {
    #[must_use]
    pub fn select(snapshot: &AccessSnapshot) -> Self {
        if snapshot.loading {
            return Self::Loading;
        }
        if snapshot.user.is_none() || !snapshot.has_access {
            return Self::LoginGate;
        }
        if snapshot.is_admin {
            return Self::AdminConsole;
        }
        match &snapshot.client_data {
            Some(client) if snapshot.is_authorized_client => Self::ClientDashboard {
                organization_name: client.organization_name.clone(),
            },
            _ => Self::LoginGate,
        }
    }
}

/// Whether the login dialog should be shown.
///
/// Open once loading has finished with nobody signed in, or whenever a
/// signed-in user lacks access. Closed while the first resolution is pending.
#[must_use]
pub fn login_prompt_open(snapshot: &AccessSnapshot) -> bool {
    match &snapshot.user {
        None => !snapshot.loading,
        Some(_) => !snapshot.has_access,
    }
}

/// Header title; clients see their organization appended.
#[must_use]
pub fn header_title(snapshot: &AccessSnapshot) -> String {
    match (&snapshot.client_data, snapshot.is_authorized_client && !snapshot.is_admin) {
        (Some(client), true) => format!("{APP_TITLE} - {}", client.organization_name),
        _ => APP_TITLE.to_owned(),
    }
}

/// Admin console sections, in navigation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminView {
    Dashboard,
    Clients,
    Billing,
    Contacts,
    Chatbots,
    Campaigns,
    MyCampaigns,
    Email,
    Social,
    Content,
    Seo,
    Analytics,
    Settings,
}

impl AdminView {
    pub const ALL: [Self; 13] = [
        Self::Dashboard,
        Self::Clients,
        Self::Billing,
        Self::Contacts,
        Self::Chatbots,
        Self::Campaigns,
        Self::MyCampaigns,
        Self::Email,
        Self::Social,
        Self::Content,
        Self::Seo,
        Self::Analytics,
        Self::Settings,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Clients => "clients",
            Self::Billing => "billing",
            Self::Contacts => "contacts",
            Self::Chatbots => "chatbots",
            Self::Campaigns => "campaigns",
            Self::MyCampaigns => "my-campaigns",
            Self::Email => "email",
            Self::Social => "social",
            Self::Content => "content",
            Self::Seo => "seo",
            Self::Analytics => "analytics",
            Self::Settings => "settings",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Clients => "Clients",
            Self::Billing => "Billing",
            Self::Contacts => "Contacts",
            Self::Chatbots => "AI Chatbots",
            Self::Campaigns => "Campaign Marketplace",
            Self::MyCampaigns => "My Campaigns",
            Self::Email => "Email Marketing",
            Self::Social => "Social Media",
            Self::Content => "Content Studio",
            Self::Seo => "SEO Analyzer",
            Self::Analytics => "Analytics",
            Self::Settings => "Settings",
        }
    }

    /// Look up a section by id; unknown ids land on the dashboard.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        Self::ALL.into_iter().find(|v| v.id() == id).unwrap_or(Self::Dashboard)
    }

    /// Sections that have no backing screen yet.
    #[must_use]
    pub fn is_placeholder(self) -> bool {
        matches!(self, Self::Contacts | Self::Chatbots | Self::Settings)
    }
}

/// One admin navigation entry as rendered in the sidebar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub placeholder: bool,
}

impl From<AdminView> for NavEntry {
    fn from(view: AdminView) -> Self {
        Self { id: view.id(), label: view.label(), placeholder: view.is_placeholder() }
    }
}

/// Admin sidebar for `snapshot`; empty unless the admin console is selected.
#[must_use]
pub fn admin_navigation(snapshot: &AccessSnapshot) -> Vec<NavEntry> {
    if ViewBranch::select(snapshot) != ViewBranch::AdminConsole {
        return Vec::new();
    }
    AdminView::ALL.into_iter().map(NavEntry::from).collect()
}

/// Sections of the client dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSection {
    Analytics,
    Campaigns,
    Email,
    Social,
    Content,
    Seo,
}

impl ClientSection {
    pub const ALL: [Self; 6] = [Self::Analytics, Self::Campaigns, Self::Email, Self::Social, Self::Content, Self::Seo];

    /// Dashboard component a plan must list to unlock this section. Analytics is always on.
    #[must_use]
    pub fn required_component(self) -> Option<&'static str> {
        match self {
            Self::Analytics => None,
            Self::Campaigns => Some("campaign_manager"),
            Self::Email => Some("email_marketing"),
            Self::Social => Some("social_media"),
            Self::Content => Some("content_studio"),
            Self::Seo => Some("seo_analyzer"),
        }
    }
}

/// Dashboard sections the client's plan unlocks, in display order.
#[must_use]
pub fn client_sections(client: &AuthorizedClient) -> Vec<ClientSection> {
    ClientSection::ALL
        .into_iter()
        .filter(|section| section.required_component().is_none_or(|c| client.has_feature(c)))
        .collect()
}
