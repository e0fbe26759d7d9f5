use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError as FieldError};

use crate::{
    access::{AdminSection, Role},
    error::{REQUIRED, ValidationError},
};

// --- Identity ---

/// Profile
///
/// Row of `public.profiles`, keyed by the Supabase `auth.users.id`. The role column is
/// free text in the database; `role()` is the only place it is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Option<String>,
}

impl Profile {
    /// Missing or unrecognised roles collapse to `Role::None` so gating fails closed.
    pub fn role(&self) -> Role {
        match self.role.as_deref() {
            None | Some("") => Role::None,
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(user_id = %self.id, "{err}; treating as 'none'");
                Role::None
            }),
        }
    }
}

/// UserProfile
///
/// Output schema for the authenticated user's identity (GET /me, login response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(custom(function = "required"), email(message = "not an email address"))]
    pub email: String,
    #[validate(length(min = 1, code = "required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: UserProfile,
}

/// SetPasswordRequest
///
/// Used by invited users to choose their first password.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct SetPasswordRequest {
    #[validate(length(min = 6, message = "must be at least 6 characters long"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub confirm_password: String,
}

// --- Admin shell ---

/// AdminLanding
///
/// Response of the public `/admin` route: tells the UI whether to render the login
/// form or move on to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminLanding {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardLink {
    pub section: AdminSection,
    pub path: String,
    pub title: String,
    pub description: String,
    pub required_roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Dashboard {
    pub user: UserProfile,
    pub links: Vec<DashboardLink>,
}

// --- Blog ---

/// BlogPost
///
/// Row of `public.blog_posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub publish_date: NaiveDate,
    pub read_time: Option<i32>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub show_ads: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostSummary
///
/// Read projection returned by the public listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub author: String,
    pub publish_date: NaiveDate,
    pub read_time: Option<i32>,
    pub image_url: Option<String>,
}

impl From<&BlogPost> for PostSummary {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            tags: post.tags.clone(),
            author: post.author.clone(),
            publish_date: post.publish_date,
            read_time: post.read_time,
            image_url: post.image_url.clone(),
        }
    }
}

/// ListInput
///
/// Accepts either a JSON array or the comma-separated text the admin forms submit.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum ListInput {
    Items(Vec<String>),
    Csv(String),
}

impl Default for ListInput {
    fn default() -> Self {
        ListInput::Items(Vec::new())
    }
}

impl ListInput {
    /// Trimmed, non-empty entries in their submitted order.
    pub fn into_items(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            ListInput::Items(items) => items,
            ListInput::Csv(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn has_items(&self) -> bool {
        match self {
            ListInput::Items(items) => items.iter().any(|s| !s.trim().is_empty()),
            ListInput::Csv(text) => text.split(',').any(|s| !s.trim().is_empty()),
        }
    }
}

/// LooseInt
///
/// Numeric form fields arrive either as numbers or as the raw input text.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum LooseInt {
    Int(i64),
    Text(String),
}

impl LooseInt {
    /// Positive values that fit in `i32`; anything else reads as "not set".
    pub fn positive(&self) -> Option<i32> {
        let value = match self {
            LooseInt::Int(n) => *n,
            LooseInt::Text(s) => s.trim().parse::<i64>().ok()?,
        };
        i32::try_from(value).ok().filter(|v| *v > 0)
    }
}

/// BlogPostInput
///
/// Create/update payload for `/admin/blog`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct BlogPostInput {
    #[validate(custom(function = "required"))]
    pub title: String,
    #[validate(custom(function = "required"))]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[validate(custom(function = "required"))]
    pub author: String,
    #[validate(custom(function = "iso_date"))]
    pub publish_date: String,
    #[serde(default)]
    pub read_time: Option<LooseInt>,
    #[serde(default)]
    pub tags: ListInput,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub show_ads: bool,
}

/// BlogPostDraft
///
/// A validated, normalised post ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogPostDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub publish_date: NaiveDate,
    pub read_time: Option<i32>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub show_ads: bool,
}

impl BlogPostInput {
    /// Checks the field rules, then trims and parses into a draft.
    pub fn into_draft(self) -> Result<BlogPostDraft, ValidationError> {
        self.validate()?;
        Ok(BlogPostDraft {
            publish_date: parse_date("publish_date", &self.publish_date)?,
            title: trimmed(self.title),
            author: trimmed(self.author),
            excerpt: trimmed(self.excerpt),
            content: self.content,
            read_time: self.read_time.as_ref().and_then(LooseInt::positive),
            tags: self.tags.into_items(),
            image_url: non_empty(self.image_url),
            published: self.published,
            show_ads: self.show_ads,
        })
    }
}

// --- About ---

/// About
///
/// Row of `public.about`: the single personal-profile record shown on the home and
/// about pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct About {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub title: String,
    pub description: String,
    pub long_description: String,
    pub skills: Vec<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct AboutInput {
    #[validate(custom(function = "required"))]
    pub name: String,
    #[validate(custom(function = "required"))]
    pub title: String,
    #[validate(custom(function = "required"))]
    pub description: String,
    #[validate(custom(function = "required"))]
    pub long_description: String,
    #[serde(default)]
    #[validate(custom(function = "has_items"))]
    pub skills: ListInput,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AboutDraft {
    pub name: String,
    pub title: String,
    pub description: String,
    pub long_description: String,
    pub skills: Vec<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

impl AboutInput {
    pub fn into_draft(self) -> Result<AboutDraft, ValidationError> {
        self.validate()?;
        Ok(AboutDraft {
            name: trimmed(self.name),
            title: trimmed(self.title),
            description: trimmed(self.description),
            long_description: trimmed(self.long_description),
            skills: self.skills.into_items(),
            education: non_empty(self.education),
            location: non_empty(self.location),
            image_url: non_empty(self.image_url),
        })
    }
}

// --- Jobs ---

/// Job
///
/// Row of `public.jobs`. Dates are month precision (`YYYY-MM`); an absent end date
/// means the position is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct JobInput {
    #[validate(custom(function = "required"))]
    pub title: String,
    #[validate(custom(function = "required"))]
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[validate(custom(function = "year_month"))]
    pub start_date: String,
    /// Blank means the position is current.
    #[serde(default)]
    #[validate(custom(function = "optional_year_month"))]
    pub end_date: Option<String>,
    #[validate(custom(function = "required"))]
    pub description: String,
    #[serde(default)]
    pub technologies: ListInput,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: Option<String>,
    pub position: i32,
}

impl JobInput {
    pub fn into_draft(self) -> Result<JobDraft, ValidationError> {
        self.validate()?;
        let start_date = trimmed(self.start_date);
        let end_date = non_empty(self.end_date);
        // Zero-padded YYYY-MM compares correctly as text.
        if end_date.as_deref().is_some_and(|end| end < start_date.as_str()) {
            return Err(ValidationError::invalid("end_date", "must not be before start_date"));
        }
        Ok(JobDraft {
            title: trimmed(self.title),
            company: trimmed(self.company),
            location: non_empty(self.location),
            website: non_empty(self.website),
            start_date,
            end_date,
            description: trimmed(self.description),
            technologies: self.technologies.into_items(),
            image_url: non_empty(self.image_url),
            position: self.position.unwrap_or(0),
        })
    }
}

// --- Certificates ---

/// Certificate
///
/// Row of `public.certificates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub credential_url: Option<String>,
    pub image_url: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct CertificateInput {
    #[validate(custom(function = "required"))]
    pub title: String,
    #[validate(custom(function = "required"))]
    pub issuer: String,
    #[validate(custom(function = "iso_date"))]
    pub issue_date: String,
    #[serde(default)]
    pub credential_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDraft {
    pub title: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub credential_url: Option<String>,
    pub image_url: Option<String>,
    pub position: i32,
}

impl CertificateInput {
    pub fn into_draft(self) -> Result<CertificateDraft, ValidationError> {
        self.validate()?;
        Ok(CertificateDraft {
            issue_date: parse_date("issue_date", &self.issue_date)?,
            title: trimmed(self.title),
            issuer: trimmed(self.issuer),
            credential_url: non_empty(self.credential_url),
            image_url: non_empty(self.image_url),
            position: self.position.unwrap_or(0),
        })
    }
}

/// PositionUpdate
///
/// One entry of a bulk re-ordering request (`PUT /admin/jobs/order`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub position: i32,
}

/// Experience
///
/// Public experience page payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Experience {
    pub jobs: Vec<Job>,
    pub certificates: Vec<Certificate>,
}

// --- Contacts ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

/// Contacts
///
/// Row of `public.contacts`. Social links are stored as a JSONB array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Contacts {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub copyright_year: Option<i32>,
    #[sqlx(json)]
    pub social_links: Vec<SocialLink>,
}

impl Contacts {
    /// First social link whose name matches case-insensitively.
    pub fn social(&self, name: &str) -> Option<&SocialLink> {
        self.social_links
            .iter()
            .find(|link| link.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct ContactsInput {
    #[validate(custom(function = "required"), email(message = "not an email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub copyright_year: Option<LooseInt>,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactsDraft {
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub copyright_year: Option<i32>,
    pub social_links: Vec<SocialLink>,
}

impl ContactsInput {
    pub fn into_draft(self) -> Result<ContactsDraft, ValidationError> {
        self.validate()?;
        let email = trimmed(self.email);
        let social_links = self
            .social_links
            .into_iter()
            .map(|link| SocialLink {
                name: link.name.trim().to_string(),
                url: link.url.trim().to_string(),
            })
            // Blank rows are left behind when an added row is never filled in.
            .filter(|link| !(link.name.is_empty() && link.url.is_empty()))
            .collect();
        Ok(ContactsDraft {
            email,
            phone: non_empty(self.phone),
            location: non_empty(self.location),
            copyright_year: self.copyright_year.as_ref().and_then(LooseInt::positive),
            social_links,
        })
    }
}

// --- Images ---

/// ImageObject
///
/// A file in the caller's image namespace together with its public URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ImageObject {
    pub name: String,
    pub url: String,
}

// --- Monetization ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GuideStep {
    pub title: String,
    pub body: String,
}

/// MonetizationGuide
///
/// Static ad setup guidance for admins. Ads render only on posts with `show_ads` set,
/// so the guide reports how many posts currently opt in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MonetizationGuide {
    pub steps: Vec<GuideStep>,
    pub posts_with_ads: usize,
    pub total_posts: usize,
}

const AD_SETUP_STEPS: [(&str, &str); 3] = [
    (
        "Choose an ad network",
        "Sign up with an ad network such as Google AdSense and wait for the account to be approved.",
    ),
    (
        "Get your ad code",
        "Once approved, the network provides a snippet (HTML, JavaScript or a component) that renders the ads.",
    ),
    (
        "Implement the code",
        "Replace the placeholder ad banner in the site with that snippet. Ads then appear on every post saved with \"Show Ad\" checked.",
    ),
];

impl MonetizationGuide {
    pub fn for_posts(posts: &[BlogPost]) -> Self {
        Self {
            steps: AD_SETUP_STEPS
                .iter()
                .map(|(title, body)| GuideStep {
                    title: title.to_string(),
                    body: body.to_string(),
                })
                .collect(),
            posts_with_ads: posts.iter().filter(|post| post.show_ads).count(),
            total_posts: posts.len(),
        }
    }
}

// --- Users ---

/// ManagedUser
///
/// An account as reported by the user-management function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ManagedUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct InviteUserRequest {
    #[validate(custom(function = "required"), email(message = "not an email address"))]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Where the invitation link should land; defaults to the set-password view.
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

// --- Field rules ---

const DATE_FORMAT: &str = "%Y-%m-%d";

fn rule(code: &'static str, message: &'static str) -> FieldError {
    let mut err = FieldError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn required(value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(rule(REQUIRED, "is required"));
    }
    Ok(())
}

fn has_items(value: &ListInput) -> Result<(), FieldError> {
    if !value.has_items() {
        return Err(rule(REQUIRED, "needs at least one entry"));
    }
    Ok(())
}

fn iso_date(value: &str) -> Result<(), FieldError> {
    required(value)?;
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| rule("date", "expected YYYY-MM-DD"))
}

fn year_month(value: &str) -> Result<(), FieldError> {
    required(value)?;
    let value = value.trim();
    let valid = value.len() == 7
        && NaiveDate::parse_from_str(&format!("{value}-01"), DATE_FORMAT).is_ok();
    if !valid {
        return Err(rule("month", "expected YYYY-MM"));
    }
    Ok(())
}

fn optional_year_month(value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    year_month(value)
}

// --- Normalisation ---

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::invalid(field, format!("expected YYYY-MM-DD, got {value:?}")))
}
