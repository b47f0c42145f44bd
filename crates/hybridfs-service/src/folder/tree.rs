//! Folder forest operations and path resolution.
//!
//! Paths are never stored. A folder's path is the list of names from its
//! root down to itself, rebuilt by walking `parent_id` links. The walk is a
//! bounded loop with a visited set, so corrupt rows (a cycle, a dangling
//! parent) shorten the path instead of hanging the request.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{info, warn};

use hybridfs_core::error::AppError;
use hybridfs_core::result::AppResult;
use hybridfs_core::types::{FolderId, Owner};
use hybridfs_database::store::{FolderRemoval, FolderStore};
use hybridfs_entity::folder::{CreateFolder, DeleteMode, Folder};

/// Longest accepted folder or file name.
const MAX_NAME_LEN: usize = 255;

/// Validate one path component (a folder or file name).
pub fn validate_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("'{name}' is not a valid name")));
    }
    if name.contains(['/', '\\']) {
        return Err(AppError::validation(format!(
            "name '{name}' must not contain path separators"
        )));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Split a slash- or backslash-separated path into its non-empty components.
pub fn split_path(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join components into the `/`-separated address the bridge understands.
pub fn join_path<S: AsRef<str>>(components: &[S]) -> String {
    components
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("/")
}

/// Owns the folder forest: creation, resolution both ways, moves, deletes.
#[derive(Clone)]
pub struct TreeService {
    folders: Arc<dyn FolderStore>,
    max_depth: usize,
}

impl std::fmt::Debug for TreeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeService")
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl TreeService {
    /// Creates a new tree service. `max_depth` caps every ancestor walk.
    pub fn new(folders: Arc<dyn FolderStore>, max_depth: usize) -> Self {
        Self {
            folders,
            max_depth: max_depth.max(1),
        }
    }

    /// Fetch one folder, scoped to `owner`.
    pub async fn find(&self, id: FolderId, owner: &Owner) -> AppResult<Option<Folder>> {
        self.folders.find_folder(id, owner).await
    }

    /// Create a folder under `parent_id` (or at the root).
    ///
    /// The parent must exist and belong to the same owner. Sibling names may
    /// repeat.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Folder> {
        let name = validate_name(name)?;

        if let Some(parent) = parent_id {
            if self.folders.find_folder(parent, owner).await?.is_none() {
                return Err(AppError::not_found(format!("Parent folder {parent} not found")));
            }
        }

        let folder = self
            .folders
            .insert_folder(&CreateFolder {
                name,
                parent_id,
                owner: owner.clone(),
            })
            .await?;

        info!(
            owner = %owner,
            folder_id = %folder.id,
            name = %folder.name,
            parent_id = ?folder.parent_id,
            "Folder created"
        );
        Ok(folder)
    }

    /// Names from the root down to `folder_id`.
    ///
    /// `None` yields an empty path. A missing start folder also yields an
    /// empty path (logged). A missing parent ends the walk as if the current
    /// node were a root. A revisited node or the depth cap ends it too.
    pub async fn resolve_path(
        &self,
        folder_id: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Vec<String>> {
        let Some(start) = folder_id else {
            return Ok(Vec::new());
        };
        let Some(mut node) = self.folders.find_folder(start, owner).await? else {
            warn!(owner = %owner, folder_id = %start, "Path requested for unknown folder");
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(node.id) {
                warn!(owner = %owner, folder_id = %node.id, "Cycle in folder parents; path truncated");
                break;
            }
            names.push(node.name.clone());
            if names.len() >= self.max_depth {
                warn!(
                    owner = %owner,
                    folder_id = %start,
                    max_depth = self.max_depth,
                    "Folder depth cap reached; path truncated"
                );
                break;
            }
            let Some(parent_id) = node.parent_id else {
                break;
            };
            match self.folders.find_folder(parent_id, owner).await? {
                Some(parent) => node = parent,
                None => {
                    warn!(
                        owner = %owner,
                        folder_id = %node.id,
                        parent_id = %parent_id,
                        "Dangling parent link; treating folder as root"
                    );
                    break;
                }
            }
        }

        names.reverse();
        Ok(names)
    }

    /// Bridge address of `name` inside `folder_id`.
    pub async fn file_path(
        &self,
        folder_id: Option<FolderId>,
        name: &str,
        owner: &Owner,
    ) -> AppResult<String> {
        let mut components = self.resolve_path(folder_id, owner).await?;
        components.push(name.to_string());
        Ok(join_path(&components))
    }

    /// Walk from the root matching each component to a child of that name.
    ///
    /// Empty components are ignored. An empty list resolves to `None`
    /// (the root); the first miss returns `Err(NotFound)`.
    pub async fn resolve_by_components<S: AsRef<str>>(
        &self,
        components: &[S],
        owner: &Owner,
    ) -> AppResult<Option<FolderId>> {
        let mut current: Option<FolderId> = None;
        for component in components.iter().map(|c| c.as_ref()) {
            let component = component.trim();
            if component.is_empty() {
                continue;
            }
            match self.folders.find_child(current, component, owner).await? {
                Some(child) => current = Some(child.id),
                None => {
                    return Err(AppError::not_found(format!(
                        "No folder '{component}' on path"
                    )));
                }
            }
        }
        Ok(current)
    }

    /// Every folder named `name`, oldest first.
    pub async fn find_by_name(&self, name: &str, owner: &Owner) -> AppResult<Vec<Folder>> {
        self.folders.find_by_name(name, owner).await
    }

    /// The oldest child of `parent_id` named `name`.
    pub async fn find_child(
        &self,
        parent_id: Option<FolderId>,
        name: &str,
        owner: &Owner,
    ) -> AppResult<Option<Folder>> {
        self.folders.find_child(parent_id, name, owner).await
    }

    /// Whether `candidate` is `folder_id` itself or one of its ancestors,
    /// within the depth cap.
    async fn is_self_or_ancestor(
        &self,
        candidate: FolderId,
        folder_id: FolderId,
        owner: &Owner,
    ) -> AppResult<bool> {
        let mut visited = HashSet::new();
        let mut next = Some(folder_id);
        while let Some(id) = next {
            if id == candidate {
                return Ok(true);
            }
            if !visited.insert(id) || visited.len() > self.max_depth {
                break;
            }
            next = self
                .folders
                .find_folder(id, owner)
                .await?
                .and_then(|f| f.parent_id);
        }
        Ok(false)
    }

    /// Move `folder_id` under `new_parent` (or to the root).
    ///
    /// Refuses with `Validation` when the move would put a folder inside its
    /// own subtree.
    pub async fn reparent(
        &self,
        folder_id: FolderId,
        new_parent: Option<FolderId>,
        owner: &Owner,
    ) -> AppResult<Folder> {
        if let Some(parent) = new_parent {
            if self.is_self_or_ancestor(folder_id, parent, owner).await? {
                return Err(AppError::validation(format!(
                    "Moving folder {folder_id} under {parent} would create a cycle"
                )));
            }
        }

        let moved = self
            .folders
            .set_parent(folder_id, new_parent, owner)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;

        info!(
            owner = %owner,
            folder_id = %folder_id,
            parent_id = ?new_parent,
            "Folder moved"
        );
        Ok(moved)
    }

    /// Delete a folder.
    ///
    /// `Cascade` removes every descendant folder and the file rows inside
    /// them in one unit. `Orphan` removes only the row; children keep their
    /// dangling `parent_id` and resolve as roots until removed themselves.
    pub async fn delete_folder(
        &self,
        folder_id: FolderId,
        owner: &Owner,
        mode: DeleteMode,
    ) -> AppResult<FolderRemoval> {
        if self.folders.find_folder(folder_id, owner).await?.is_none() {
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }

        let removal = match mode {
            DeleteMode::Orphan => {
                self.folders
                    .delete_folders(&[folder_id], owner, false)
                    .await?
            }
            DeleteMode::Cascade => {
                let subtree = self.collect_subtree(folder_id, owner).await?;
                self.folders.delete_folders(&subtree, owner, true).await?
            }
        };

        info!(
            owner = %owner,
            folder_id = %folder_id,
            mode = ?mode,
            folders = removal.folders,
            files = removal.files,
            "Folder deleted"
        );
        Ok(removal)
    }

    /// `root` plus every folder reachable through child links.
    async fn collect_subtree(&self, root: FolderId, owner: &Owner) -> AppResult<Vec<FolderId>> {
        let mut seen = HashSet::from([root]);
        let mut order = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            for child in self.folders.child_ids(id, owner).await? {
                if seen.insert(child) {
                    order.push(child);
                    queue.push_back(child);
                }
            }
        }
        Ok(order)
    }
}
