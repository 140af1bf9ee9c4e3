use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::SerialiseError;
use crate::stac::{Collection, Item, Link};

pub const COLLECTION_FILE: &str = "collection.json";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SerialiseError + '_ {
    move |source| SerialiseError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SerialiseError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| SerialiseError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error(path))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SerialiseError> {
    let file = File::open(path).map_err(io_error(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SerialiseError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `<root>/collection.json` and `<root>/<item>/<item>.json` with
/// relative links between them. Returns the collection path.
pub fn write_collection(collection: &Collection, root: &Path) -> Result<PathBuf, SerialiseError> {
    let mut document = collection.clone();
    document.links.retain(|link| !is_tree_link(&link.rel));
    let root_link = Link::new("root", format!("./{COLLECTION_FILE}"));
    document.links.insert(0, root_link.with_title(collection.id.clone()));

    for item in &collection.items {
        let href = format!("./{0}/{0}.json", item.id);
        document.links.push(Link::new("item", href));

        let mut item = item.clone();
        item.links.retain(|link| !is_tree_link(&link.rel));
        let up = format!("../{COLLECTION_FILE}");
        for rel in ["root", "parent", "collection"] {
            item.links.push(Link::new(rel, up.clone()));
        }
        item.collection = Some(collection.id.clone());
        write_json(&root.join(&item.id).join(format!("{}.json", item.id)), &item)?;
    }

    let path = root.join(COLLECTION_FILE);
    write_json(&path, &document)?;
    Ok(path)
}

/// Reads a tree written by [`write_collection`], following its `item` links.
pub fn read_collection(root: &Path) -> Result<Collection, SerialiseError> {
    let mut collection: Collection = read_json(&root.join(COLLECTION_FILE))?;
    let hrefs: Vec<String> = collection
        .links
        .iter()
        .filter(|link| link.rel == "item")
        .map(|link| link.href.clone())
        .collect();
    for href in hrefs {
        let item: Item = read_json(&root.join(href.trim_start_matches("./")))?;
        collection.items.push(item);
    }
    Ok(collection)
}

fn is_tree_link(rel: &str) -> bool {
    matches!(rel, "root" | "parent" | "collection" | "item" | "self")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Bbox;
    use crate::geometry::Geometry;
    use crate::stac::Extent;
    use crate::temporal::{ItemTime, TimeRange};
    use chrono::{DateTime, Utc};
    use tempfile::tempdir;

    fn collection() -> Collection {
        let at: DateTime<Utc> = "2017-01-01T00:00:00Z".parse().unwrap();
        let time = ItemTime {
            datetime: at,
            range: TimeRange::instant(at),
        };
        let mut collection = Collection::new(
            "farm",
            "Soil samples",
            "proprietary",
            Extent::new(Bbox::new(150.0, 151.0, -25.0, -24.0).unwrap(), TimeRange::instant(at)),
        );
        collection.items = vec![
            Item::new("north", Geometry::Point(vec![150.2, -24.2]), time),
            Item::new("south", Geometry::Point(vec![150.8, -24.8]), time),
        ];
        collection
    }

    #[test]
    fn test_write_layout_and_links() {
        let dir = tempdir().unwrap();
        let path = write_collection(&collection(), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("collection.json"));
        assert!(dir.path().join("north").join("north.json").exists());

        let item: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("south/south.json")).unwrap())
                .unwrap();
        let parent = item["links"]
            .as_array()
            .unwrap()
            .iter()
            .find(|link| link["rel"] == "parent")
            .unwrap();
        assert_eq!(parent["href"], "../collection.json");
        assert_eq!(item["collection"], "farm");
    }

    #[test]
    fn test_round_trip_keeps_extent_and_items() {
        let dir = tempdir().unwrap();
        let original = collection();
        write_collection(&original, dir.path()).unwrap();

        let read = read_collection(dir.path()).unwrap();
        assert_eq!(read.extent, original.extent);
        let ids: Vec<&str> = read.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["north", "south"]);
    }

    #[test]
    fn test_rewrite_does_not_duplicate_links() {
        let dir = tempdir().unwrap();
        write_collection(&collection(), dir.path()).unwrap();
        let read = read_collection(dir.path()).unwrap();
        write_collection(&read, dir.path()).unwrap();

        let again = read_collection(dir.path()).unwrap();
        assert_eq!(again.links.iter().filter(|l| l.rel == "item").count(), 2);
        assert_eq!(again.items[0].links.len(), 3);
    }
}
