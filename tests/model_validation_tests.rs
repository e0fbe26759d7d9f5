use chrono::NaiveDate;
use portfolio_cms::{
    access::Role,
    error::ValidationError,
    models::{
        AboutInput, BlogPostInput, CertificateInput, ContactsInput, InviteUserRequest, JobInput,
        ListInput, LoginRequest, LooseInt, Profile, SetPasswordRequest, SocialLink,
    },
};
use uuid::Uuid;
use validator::Validate;

/// The single error a handler would report for this payload.
fn reported<T: Validate>(payload: &T) -> ValidationError {
    ValidationError::from(payload.validate().unwrap_err())
}

fn blog_input() -> BlogPostInput {
    BlogPostInput {
        title: "  Hello  ".to_string(),
        excerpt: "Short".to_string(),
        content: "Body".to_string(),
        author: "Ada".to_string(),
        publish_date: "2024-03-01".to_string(),
        ..Default::default()
    }
}

fn job_input() -> JobInput {
    JobInput {
        title: "Engineer".to_string(),
        company: "Acme".to_string(),
        start_date: "2021-09".to_string(),
        description: "Built things".to_string(),
        ..Default::default()
    }
}

// --- Blog ---

#[test]
fn test_blog_post_input_normalises() {
    let input = BlogPostInput {
        read_time: Some(LooseInt::Text(" 7 ".to_string())),
        tags: ListInput::Csv("rust, web , ,axum".to_string()),
        image_url: Some("   ".to_string()),
        ..blog_input()
    };

    let draft = input.into_draft().unwrap();

    assert_eq!(draft.title, "Hello");
    assert_eq!(draft.publish_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(draft.read_time, Some(7));
    assert_eq!(draft.tags, vec!["rust", "web", "axum"]);
    assert_eq!(draft.image_url, None);
    assert!(!draft.published);
}

#[test]
fn test_blog_post_input_requires_title() {
    let input = BlogPostInput {
        title: "   ".to_string(),
        ..blog_input()
    };
    assert_eq!(input.into_draft().unwrap_err(), ValidationError::required("title"));
}

#[test]
fn test_blog_post_input_rejects_bad_date() {
    let input = BlogPostInput {
        publish_date: "01/03/2024".to_string(),
        ..blog_input()
    };
    let err = input.into_draft().unwrap_err();
    assert!(matches!(err, ValidationError::Invalid { .. }));
    assert_eq!(err.field(), "publish_date");
}

#[test]
fn test_loose_int_only_keeps_positive_values() {
    assert_eq!(LooseInt::Int(5).positive(), Some(5));
    assert_eq!(LooseInt::Int(0).positive(), None);
    assert_eq!(LooseInt::Int(-3).positive(), None);
    assert_eq!(LooseInt::Int(i64::MAX).positive(), None);
    assert_eq!(LooseInt::Text("abc".to_string()).positive(), None);
    assert_eq!(LooseInt::Text("".to_string()).positive(), None);
}

#[test]
fn test_list_input_accepts_array_or_text() {
    let from_array: ListInput = serde_json::from_str(r#"["a", " b "]"#).unwrap();
    let from_text: ListInput = serde_json::from_str(r#""a, b""#).unwrap();

    assert_eq!(from_array.into_items(), vec!["a", "b"]);
    assert_eq!(from_text.into_items(), vec!["a", "b"]);
}

// --- About ---

#[test]
fn test_about_requires_at_least_one_skill() {
    let input = AboutInput {
        name: "Ada".to_string(),
        title: "Engineer".to_string(),
        description: "Hi".to_string(),
        long_description: "Hello there".to_string(),
        skills: ListInput::Csv(" , ".to_string()),
        ..Default::default()
    };
    assert_eq!(input.into_draft().unwrap_err(), ValidationError::required("skills"));
}

// --- Jobs ---

#[test]
fn test_job_current_position_has_no_end_date() {
    let draft = job_input().into_draft().unwrap();
    assert_eq!(draft.end_date, None);
    assert_eq!(draft.position, 0);
}

#[test]
fn test_job_end_before_start_is_rejected() {
    let input = JobInput {
        end_date: Some("2021-08".to_string()),
        ..job_input()
    };
    let err = input.into_draft().unwrap_err();
    assert!(matches!(err, ValidationError::Invalid { .. }));
    assert_eq!(err.field(), "end_date");
}

#[test]
fn test_job_month_format_is_strict() {
    for bad in ["2021-9", "2021-13", "2021-09-01", "Sept 2021"] {
        let input = JobInput {
            start_date: bad.to_string(),
            ..job_input()
        };
        assert_eq!(
            input.into_draft().unwrap_err().field(),
            "start_date",
            "{bad} should be rejected"
        );
    }
}

// --- Certificates ---

#[test]
fn test_certificate_requires_issuer() {
    let input = CertificateInput {
        title: "AWS SA".to_string(),
        issuer: String::new(),
        issue_date: "2023-05-10".to_string(),
        ..Default::default()
    };
    assert_eq!(input.into_draft().unwrap_err(), ValidationError::required("issuer"));
}

// --- Contacts ---

#[test]
fn test_contacts_drops_blank_social_rows() {
    let input = ContactsInput {
        email: "me@example.com".to_string(),
        copyright_year: Some(LooseInt::Text("2025".to_string())),
        social_links: vec![
            SocialLink {
                name: " GitHub ".to_string(),
                url: "https://github.com/me".to_string(),
            },
            SocialLink::default(),
        ],
        ..Default::default()
    };

    let draft = input.into_draft().unwrap();
    assert_eq!(draft.copyright_year, Some(2025));
    assert_eq!(draft.social_links.len(), 1);
    assert_eq!(draft.social_links[0].name, "GitHub");
}

#[test]
fn test_contacts_rejects_malformed_email() {
    let input = ContactsInput {
        email: "not-an-email".to_string(),
        ..Default::default()
    };
    assert_eq!(
        input.into_draft().unwrap_err(),
        ValidationError::invalid("email", "not an email address")
    );
}

// --- Identity ---

#[test]
fn test_login_request_requires_both_fields() {
    let no_password = LoginRequest {
        email: "a@b.c".to_string(),
        password: String::new(),
    };
    assert_eq!(reported(&no_password), ValidationError::required("password"));

    let no_email = LoginRequest {
        email: "  ".to_string(),
        password: "secret".to_string(),
    };
    // Blank is reported as missing, not as a malformed address.
    assert_eq!(reported(&no_email), ValidationError::required("email"));
}

#[test]
fn test_set_password_rules() {
    let short = SetPasswordRequest {
        password: "12345".to_string(),
        confirm_password: "12345".to_string(),
    };
    assert_eq!(
        reported(&short),
        ValidationError::invalid("password", "must be at least 6 characters long")
    );

    let mismatch = SetPasswordRequest {
        password: "123456".to_string(),
        confirm_password: "1234567".to_string(),
    };
    assert_eq!(
        reported(&mismatch),
        ValidationError::invalid("confirm_password", "passwords do not match")
    );

    let ok = SetPasswordRequest {
        password: "123456".to_string(),
        confirm_password: "123456".to_string(),
    };
    assert!(ok.validate().is_ok());
}

#[test]
fn test_profile_role_fails_closed() {
    let profile = |role: Option<&str>| Profile {
        id: Uuid::new_v4(),
        email: "x@example.com".to_string(),
        role: role.map(str::to_string),
    };

    assert_eq!(profile(Some("admin")).role(), Role::Admin);
    assert_eq!(profile(Some("blog-editor")).role(), Role::BlogEditor);
    assert_eq!(profile(Some("root")).role(), Role::None);
    assert_eq!(profile(Some("")).role(), Role::None);
    assert_eq!(profile(None).role(), Role::None);
}

#[test]
fn test_invite_request_defaults() {
    let invite: InviteUserRequest =
        serde_json::from_str(r#"{"email": "new@example.com"}"#).unwrap();

    assert_eq!(invite.role, Role::None);
    assert!(invite.redirect_to.is_none());
    assert!(invite.validate().is_ok());
}

#[test]
fn test_invite_request_rejects_bad_email() {
    let invite = InviteUserRequest {
        email: "nobody".to_string(),
        role: Role::BlogEditor,
        redirect_to: None,
    };
    assert_eq!(reported(&invite).field(), "email");
}

#[test]
fn test_first_failing_field_is_reported_in_name_order() {
    let input = BlogPostInput {
        title: String::new(),
        author: String::new(),
        publish_date: "soon".to_string(),
        ..blog_input()
    };

    let errors = input.validate().unwrap_err();
    assert_eq!(errors.field_errors().len(), 3);
    assert_eq!(ValidationError::from(errors), ValidationError::required("author"));
}

#[test]
fn test_job_blank_end_date_means_current() {
    let input = JobInput {
        end_date: Some("  ".to_string()),
        ..job_input()
    };
    assert_eq!(input.into_draft().unwrap().end_date, None);
}
