use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The closed set of capability labels stored on a profile. An authenticated
/// identity always carries exactly one of these; an unauthenticated caller has
/// no role at all (modelled as an absent session, never as a fourth variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Role {
    Admin,
    BlogEditor,
    #[default]
    None,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::BlogEditor, Role::None];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::BlogEditor => "blog-editor",
            Role::None => "none",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "blog-editor" => Ok(Role::BlogEditor),
            "none" => Ok(Role::None),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Anything that represents an authenticated identity for gating purposes.
pub trait Principal {
    fn role(&self) -> Role;
}

impl Principal for Role {
    fn role(&self) -> Role {
        *self
    }
}

/// can_access
///
/// Pure decision: denied when there is no session or when the session's role is
/// not a member of `required_roles`.
pub fn can_access<P: Principal + ?Sized>(session: Option<&P>, required_roles: &[Role]) -> bool {
    match session {
        None => false,
        Some(principal) => required_roles.contains(&principal.role()),
    }
}

/// AdminSection
///
/// One management area of the admin panel. The section is the unit of capability
/// gating: both the dashboard link and every `/admin/<section>/...` endpoint use the
/// same required-role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum AdminSection {
    About,
    Jobs,
    Certificates,
    Blog,
    Contacts,
    Users,
    Images,
    Monetization,
    CvGenerator,
}

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const CONTENT_EDITORS: &[Role] = &[Role::Admin, Role::BlogEditor];

impl AdminSection {
    pub const ALL: [AdminSection; 9] = [
        AdminSection::About,
        AdminSection::Jobs,
        AdminSection::Certificates,
        AdminSection::Blog,
        AdminSection::Contacts,
        AdminSection::Users,
        AdminSection::Images,
        AdminSection::Monetization,
        AdminSection::CvGenerator,
    ];

    pub fn required_roles(self) -> &'static [Role] {
        match self {
            AdminSection::Blog | AdminSection::Images => CONTENT_EDITORS,
            AdminSection::About
            | AdminSection::Jobs
            | AdminSection::Certificates
            | AdminSection::Contacts
            | AdminSection::Users
            | AdminSection::Monetization
            | AdminSection::CvGenerator => ADMIN_ONLY,
        }
    }

    /// The path segment directly under `/admin/`.
    pub fn segment(self) -> &'static str {
        match self {
            AdminSection::About => "about",
            AdminSection::Jobs => "jobs",
            AdminSection::Certificates => "certificates",
            AdminSection::Blog => "blog",
            AdminSection::Contacts => "contacts",
            AdminSection::Users => "users",
            AdminSection::Images => "images",
            AdminSection::Monetization => "monetization",
            AdminSection::CvGenerator => "cv-generator",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.segment() == segment)
    }
}

/// AdminLink
///
/// Static descriptor of a dashboard entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminLink {
    pub section: AdminSection,
    pub path: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl AdminLink {
    pub fn required_roles(&self) -> &'static [Role] {
        self.section.required_roles()
    }
}

pub const ADMIN_LINKS: [AdminLink; 9] = [
    AdminLink {
        section: AdminSection::About,
        path: "/admin/about",
        title: "Update About Me",
        description: "Edit your personal information.",
    },
    AdminLink {
        section: AdminSection::Jobs,
        path: "/admin/jobs",
        title: "Manage Jobs",
        description: "Add, edit, or remove job experiences.",
    },
    AdminLink {
        section: AdminSection::Certificates,
        path: "/admin/certificates",
        title: "Manage Certificates",
        description: "Add and organize your certifications.",
    },
    AdminLink {
        section: AdminSection::Blog,
        path: "/admin/blog",
        title: "Manage Blog",
        description: "Create and manage your blog posts.",
    },
    AdminLink {
        section: AdminSection::Contacts,
        path: "/admin/contacts",
        title: "Update Contacts",
        description: "Manage contact and social media links.",
    },
    AdminLink {
        section: AdminSection::Users,
        path: "/admin/users",
        title: "Manage Users",
        description: "View and manage user accounts.",
    },
    AdminLink {
        section: AdminSection::Images,
        path: "/admin/images",
        title: "Manage Images",
        description: "Upload and organize your images.",
    },
    AdminLink {
        section: AdminSection::Monetization,
        path: "/admin/monetization",
        title: "Monetization",
        description: "Set up ads for your blog.",
    },
    AdminLink {
        section: AdminSection::CvGenerator,
        path: "/admin/cv-generator",
        title: "CV Generator",
        description: "Create a CV from your profile data.",
    },
];

/// visible_links
///
/// Capability gating for the dashboard: the links whose required roles contain the
/// session's role, in table order. An absent session sees nothing.
pub fn visible_links<P: Principal + ?Sized>(session: Option<&P>) -> Vec<&'static AdminLink> {
    ADMIN_LINKS
        .iter()
        .filter(|link| can_access(session, link.required_roles()))
        .collect()
}

/// RouteAccess
///
/// What a path demands before it may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// Any authenticated identity.
    Session,
    /// An authenticated identity whose role is in the section's required set.
    Section(AdminSection),
}

/// route_access
///
/// Classifies a request or view path. `/admin` itself is public (it renders either the
/// login form or the landing), everything beneath it needs a session and, for the
/// management sections, a qualifying role.
pub fn route_access(path: &str) -> RouteAccess {
    let path = path.trim_end_matches('/');
    let Some(rest) = path.strip_prefix("/admin/") else {
        return RouteAccess::Public;
    };

    let segment = rest.split('/').next().unwrap_or_default();
    match AdminSection::from_segment(segment) {
        Some(section) => RouteAccess::Section(section),
        None => RouteAccess::Session,
    }
}

/// AccessDecision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Existence gating failed: no session.
    RedirectToLogin,
    /// Capability gating failed: session present, role insufficient.
    Deny,
}

/// decide
///
/// Applies both enforcement levels to a path for the given session.
pub fn decide<P: Principal + ?Sized>(path: &str, session: Option<&P>) -> AccessDecision {
    match route_access(path) {
        RouteAccess::Public => AccessDecision::Allow,
        RouteAccess::Session => match session {
            Some(_) => AccessDecision::Allow,
            None => AccessDecision::RedirectToLogin,
        },
        RouteAccess::Section(section) => match session {
            None => AccessDecision::RedirectToLogin,
            Some(_) if can_access(session, section.required_roles()) => AccessDecision::Allow,
            Some(_) => AccessDecision::Deny,
        },
    }
}
