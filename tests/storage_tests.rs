use portfolio_cms::{
    error::StoreError,
    storage::{
        FOLDER_PLACEHOLDER, LIST_LIMIT, MOCK_PUBLIC_URL, MockStorageService, S3StorageClient,
        StorageService, sanitize_key,
    },
};
use uuid::Uuid;

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_upload_returns_public_url() {
        let mock = MockStorageService::new();
        let owner = Uuid::new_v4().to_string();

        let url = mock
            .upload(&owner, "cover.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        assert_eq!(url, format!("{MOCK_PUBLIC_URL}/{owner}/cover.png"));
        assert_eq!(
            mock.object(&owner, "cover.png").await,
            Some(("image/png".to_string(), 3))
        );
    }

    #[tokio::test]
    async fn test_mock_list_is_scoped_to_namespace() {
        let mock = MockStorageService::new();
        mock.upload("alice", "a.png", vec![0], "image/png").await.unwrap();
        mock.upload("alice", "b.jpg", vec![0], "image/jpeg").await.unwrap();
        mock.upload("bob", "c.png", vec![0], "image/png").await.unwrap();

        let names: Vec<String> = mock
            .list("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|image| image.name)
            .collect();

        assert_eq!(names, vec!["b.jpg", "a.png"]);
        assert!(mock.list("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_list_is_newest_first() {
        let mock = MockStorageService::new();
        for name in ["first.png", "second.png", "third.png"] {
            mock.upload("alice", name, vec![0], "image/png").await.unwrap();
        }
        // Re-uploading moves an image back to the front.
        mock.upload("alice", "first.png", vec![1], "image/png").await.unwrap();

        let names: Vec<String> = mock
            .list("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|image| image.name)
            .collect();

        assert_eq!(names, vec!["first.png", "third.png", "second.png"]);
    }

    #[tokio::test]
    async fn test_mock_list_is_capped() {
        let mock = MockStorageService::new();
        for i in 0..(LIST_LIMIT + 5) {
            mock.upload("alice", &format!("{i}.png"), vec![0], "image/png")
                .await
                .unwrap();
        }

        let images = mock.list("alice").await.unwrap();
        assert_eq!(images.len(), LIST_LIMIT);
        assert_eq!(images[0].name, format!("{}.png", LIST_LIMIT + 4));
        assert!(!images.iter().any(|image| image.name == "0.png"));
    }

    #[tokio::test]
    async fn test_mock_list_hides_folder_placeholder() {
        let mock = MockStorageService::new();
        mock.upload("alice", FOLDER_PLACEHOLDER, Vec::new(), "text/plain")
            .await
            .unwrap();
        mock.upload("alice", "a.png", vec![0], "image/png").await.unwrap();

        let images = mock.list("alice").await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "a.png");
    }

    #[tokio::test]
    async fn test_mock_delete() {
        let mock = MockStorageService::new();
        mock.upload("alice", "a.png", vec![0], "image/png").await.unwrap();

        mock.delete("alice", "a.png").await.unwrap();
        assert!(mock.object("alice", "a.png").await.is_none());
        assert_eq!(mock.delete("alice", "a.png").await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();

        let result = mock.upload("alice", "a.png", vec![0], "image/png").await;
        assert!(matches!(result, Err(StoreError::Network(_))));
        assert!(mock.list("alice").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();

        let url = mock
            .upload("../../alice", "./a.png", vec![0], "image/png")
            .await
            .unwrap();

        assert!(!url.contains(".."));
        assert!(url.ends_with("/alice/a.png"));
    }

    #[tokio::test]
    async fn test_mock_rejects_nested_or_empty_names() {
        let mock = MockStorageService::new();

        let nested = mock.upload("alice", "sub/a.png", vec![0], "image/png").await;
        assert!(matches!(nested, Err(StoreError::Constraint(_))));

        let empty = mock.upload("alice", "..", vec![0], "image/png").await;
        assert!(matches!(empty, Err(StoreError::Constraint(_))));

        let no_namespace = mock.upload("", "a.png", vec![0], "image/png").await;
        assert!(matches!(no_namespace, Err(StoreError::Constraint(_))));
    }
}

#[test]
fn test_sanitize_key() {
    assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
    assert_eq!(sanitize_key("/a//b/./c/"), "a/b/c");
    assert_eq!(sanitize_key("plain.png"), "plain.png");
    assert_eq!(sanitize_key(".."), "");
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_client_creation() {
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
            "http://localhost:9000/testbucket/",
        )
        .await;
        // Just testing that construction doesn't panic
    }

    #[tokio::test]
    async fn test_s3_rejects_invalid_name_before_network() {
        let client = S3StorageClient::new(
            "http://127.0.0.1:1",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
            "http://127.0.0.1:1/testbucket",
        )
        .await;

        let result = client.delete("alice", "nested/name.png").await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }
}
