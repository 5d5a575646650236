use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};

fn main() {
    println!("cargo:rerun-if-changed=static/");
    println!("cargo:rerun-if-changed=templates/");

    let mut hasher = DefaultHasher::new();

    // Missing static dir still yields a stable hash.
    let mut entries: Vec<_> = fs::read_dir("static")
        .map(|dir| dir.filter_map(|e| e.ok()).collect())
        .unwrap_or_default();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Ok(contents) = fs::read(&path) else {
            continue;
        };
        entry.file_name().to_string_lossy().hash(&mut hasher);
        contents.hash(&mut hasher);
    }

    let hash = format!("{:016x}", hasher.finish());
    println!("cargo:rustc-env=STATIC_HASH={}", &hash[..8]);
}
