//! Blocking and async walks must agree entry for entry.

use std::fs;
use std::path::Path;

use fsjet::{
    ChecksumAlgorithm, InspectOptions, SymlinkMode, WalkEntry, WalkOptions, walk_iter, walk_stream,
    walk_sync,
};
use futures::TryStreamExt;
use tempfile::TempDir;

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for d in ["src/bin", "src/lib/deep/deeper", "docs", "empty", ".hidden"] {
        fs::create_dir_all(root.join(d)).unwrap();
    }
    for (file, body) in [
        ("README.md", "readme"),
        ("src/main.rs", "fn main() {}"),
        ("src/bin/tool.rs", "fn main() {}"),
        ("src/lib/mod.rs", ""),
        ("src/lib/deep/deeper/leaf.txt", "leaf"),
        ("docs/guide.md", "guide"),
        (".hidden/secret", "s"),
    ] {
        fs::write(root.join(file), body).unwrap();
    }
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink("src/lib", root.join("lib-link")).unwrap();
        std::os::unix::fs::symlink("nowhere", root.join("dangling")).unwrap();
    }
    dir
}

fn visited(root: &Path, options: &WalkOptions) -> Vec<WalkEntry> {
    let mut out = Vec::new();
    walk_sync(root, options, |entry| {
        out.push(entry.clone());
        Ok(())
    })
    .unwrap();
    out
}

async fn assert_all_modes_agree(root: &Path, options: &WalkOptions) {
    let eager = visited(root, options);
    let pulled: Vec<_> = walk_iter(root, options)
        .collect::<fsjet::Result<_>>()
        .unwrap();
    let streamed: Vec<_> = walk_stream(root, options)
        .into_stream()
        .try_collect()
        .await
        .unwrap();

    assert!(!eager.is_empty());
    assert_eq!(eager, pulled, "iterator diverged for {options:?}");
    assert_eq!(eager, streamed, "stream diverged for {options:?}");
}

#[tokio::test]
async fn test_default_walk_agrees() {
    let dir = fixture();
    assert_all_modes_agree(dir.path(), &WalkOptions::default()).await;
}

#[tokio::test]
async fn test_depth_limited_walks_agree() {
    let dir = fixture();
    for max_depth in 0..5 {
        let options = WalkOptions {
            max_depth: Some(max_depth),
            ..Default::default()
        };
        assert_all_modes_agree(dir.path(), &options).await;
        assert!(
            visited(dir.path(), &options)
                .iter()
                .all(|entry| entry.depth <= max_depth)
        );
    }
}

#[tokio::test]
async fn test_fully_inspected_walk_agrees() {
    let dir = fixture();
    let options = WalkOptions {
        max_depth: None,
        inspect: InspectOptions {
            checksum: Some(ChecksumAlgorithm::Sha512),
            mode: true,
            absolute_path: true,
            ..Default::default()
        },
    };
    assert_all_modes_agree(dir.path(), &options).await;
}

#[tokio::test]
async fn test_following_walk_agrees() {
    let dir = fixture();
    let options = WalkOptions {
        max_depth: None,
        inspect: InspectOptions {
            symlinks: SymlinkMode::Follow,
            ..Default::default()
        },
    };
    assert_all_modes_agree(dir.path(), &options).await;

    #[cfg(unix)]
    {
        let entries = visited(dir.path(), &options);
        let dangling = entries
            .iter()
            .find(|e| e.path.ends_with("dangling"))
            .unwrap();
        assert_eq!(dangling.descriptor, None);
        // src/lib and lib-link are the same directory: only the first one
        // reached is expanded.
        let leaves = entries
            .iter()
            .filter(|e| e.path.ends_with("deep/deeper/leaf.txt"))
            .count();
        assert_eq!(leaves, 1);
    }
}

#[tokio::test]
async fn test_missing_root_agrees() {
    let dir = fixture();
    let root = dir.path().join("not-there");
    assert_all_modes_agree(&root, &WalkOptions::default()).await;
    assert_eq!(visited(&root, &WalkOptions::default()).len(), 1);
}

#[tokio::test]
async fn test_partial_pull_then_drop() {
    let dir = fixture();
    let eager = visited(dir.path(), &WalkOptions::default());

    let mut walk = walk_stream(dir.path(), &WalkOptions::default());
    let mut prefix = Vec::new();
    for _ in 0..3 {
        prefix.push(walk.next().await.unwrap().unwrap());
    }
    drop(walk);
    assert_eq!(prefix, eager[..3]);

    let first_four: Vec<_> = walk_iter(dir.path(), &WalkOptions::default())
        .take(4)
        .collect::<fsjet::Result<_>>()
        .unwrap();
    assert_eq!(first_four, eager[..4]);
}
