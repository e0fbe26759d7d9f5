use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::{About, Certificate, Contacts, Job};

const LINKEDIN_PREFIX: &str = "https://www.linkedin.com/in/";
const GITHUB_PREFIX: &str = "https://github.com/";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CvContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    /// Profile handle, without the LinkedIn URL prefix.
    pub linkedin: Option<String>,
    /// Username, without the GitHub URL prefix.
    pub github: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CvJob {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    /// e.g. "March 2021 - Present".
    pub period: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CvCertificate {
    pub title: String,
    pub issuer: String,
    pub issued: String,
}

/// CvDocument
///
/// Print-ready CV assembled from the portfolio content. Rendering is up to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CvDocument {
    pub name: String,
    pub title: String,
    pub summary: String,
    pub contact: CvContact,
    pub experience: Vec<CvJob>,
    pub certificates: Vec<CvCertificate>,
    pub skills: Vec<String>,
}

/// `YYYY-MM` as "Month YYYY". An absent end date reads "Present"; text that is not a
/// month is passed through.
pub fn format_month(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None | Some("Present") => "Present".to_string(),
        Some(month) => NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|_| month.to_string()),
    }
}

fn handle(url: &str, prefix: &str) -> String {
    url.strip_prefix(prefix)
        .unwrap_or(url)
        .trim_end_matches('/')
        .to_string()
}

/// build_cv
///
/// Jobs and certificates keep their display order by `position`.
pub fn build_cv(
    about: About,
    contacts: Option<Contacts>,
    mut jobs: Vec<Job>,
    mut certificates: Vec<Certificate>,
) -> CvDocument {
    jobs.sort_by_key(|j| j.position);
    certificates.sort_by_key(|c| c.position);

    let contact = contacts
        .map(|c| CvContact {
            linkedin: c.social("linkedin").map(|l| handle(&l.url, LINKEDIN_PREFIX)),
            github: c.social("github").map(|l| handle(&l.url, GITHUB_PREFIX)),
            email: Some(c.email),
            phone: c.phone,
            location: c.location,
        })
        .unwrap_or_default();

    CvDocument {
        summary: if about.long_description.is_empty() {
            about.description
        } else {
            about.long_description
        },
        name: about.name,
        title: about.title,
        contact,
        experience: jobs
            .into_iter()
            .map(|job| CvJob {
                period: format!(
                    "{} - {}",
                    format_month(Some(&job.start_date)),
                    format_month(job.end_date.as_deref())
                ),
                title: job.title,
                company: job.company,
                location: job.location,
                description: job.description,
            })
            .collect(),
        certificates: certificates
            .into_iter()
            .map(|cert| CvCertificate {
                issued: cert.issue_date.format("%B %Y").to_string(),
                title: cert.title,
                issuer: cert.issuer,
            })
            .collect(),
        skills: about.skills,
    }
}
