//! Session-scoped override store
//!
//! Overrides live in memory per session and are flushed to the workspace's
//! overrides file after every mutation. Overrides found in that file at
//! startup are "orphaned" until a live session claims them.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use patchwork_core::{
    remediation_hint, CoreError, InstanceId, Override, OverrideOp, OverrideTarget,
    PatchworkConfig, PropertyPath, SessionId, SessionOverride,
};

use crate::document::{parse_overrides_file, render_overrides_file, OverridesDocument};
use crate::error::{OverrideStoreError, OverrideStoreResult};
use crate::persist::write_atomically;

/// A persisted override not yet claimed by a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedOverride {
    /// Target kind the override was persisted under
    pub target: OverrideTarget,
    /// The override itself
    #[serde(flatten)]
    pub entry: Override,
}

/// `instanceId:path` key, ordered by instance then path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct OverrideKey {
    instance_id: InstanceId,
    path: PropertyPath,
}

impl OverrideKey {
    fn of(entry: &Override) -> Self {
        Self {
            instance_id: entry.instance_id.clone(),
            path: entry.path.clone(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    target: OverrideTarget,
    overrides: BTreeMap<OverrideKey, Override>,
}

impl SessionState {
    fn new(target: OverrideTarget) -> Self {
        Self {
            target,
            overrides: BTreeMap::new(),
        }
    }

    fn apply(&mut self, op: OverrideOp) {
        match op {
            OverrideOp::Set {
                instance_id,
                path,
                value,
                component_type_id,
                instance_locator,
            } => {
                let entry = Override {
                    instance_id,
                    path,
                    value,
                    component_type_id,
                    instance_locator,
                };
                self.overrides.insert(OverrideKey::of(&entry), entry);
            }
            OverrideOp::Clear { instance_id, path } => {
                let key = OverrideKey { instance_id, path };
                if self.overrides.remove(&key).is_none() {
                    debug!(
                        instance_id = %key.instance_id,
                        path = %key.path,
                        "Clearing an override that does not exist"
                    );
                }
            }
            OverrideOp::ClearInstance { instance_id } => {
                self.overrides
                    .retain(|key, _| key.instance_id != instance_id);
            }
            OverrideOp::ClearAll => self.overrides.clear(),
        }
    }
}

#[derive(Debug, Default)]
struct OverrideState {
    sessions: HashMap<SessionId, SessionState>,
    orphaned: BTreeMap<(OverrideTarget, OverrideKey), Override>,
}

impl OverrideState {
    /// Orphans first, then sessions in id order, so live sessions win ties
    fn persisted_entries(&self) -> Vec<(OverrideTarget, Override)> {
        let mut entries: Vec<(OverrideTarget, Override)> = self
            .orphaned
            .iter()
            .map(|((target, _), entry)| (*target, entry.clone()))
            .collect();

        let mut session_ids: Vec<&SessionId> = self.sessions.keys().collect();
        session_ids.sort();
        for session_id in session_ids {
            let session = &self.sessions[session_id];
            entries.extend(
                session
                    .overrides
                    .values()
                    .map(|entry| (session.target, entry.clone())),
            );
        }
        entries
    }
}

/// File-backed, session-scoped override store
pub struct OverrideStore {
    path: PathBuf,
    state: Mutex<OverrideState>,
}

impl OverrideStore {
    /// Open the store for a workspace, loading any persisted overrides as orphans
    pub async fn open(
        workspace_root: &Path,
        config: &PatchworkConfig,
    ) -> OverrideStoreResult<Self> {
        let path = config.overrides_path(workspace_root);
        let mut state = OverrideState::default();

        match fs::read(&path).await {
            Ok(bytes) => {
                let document =
                    parse_overrides_file(&bytes).map_err(|source| OverrideStoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                for (target, entry) in document.entries() {
                    state
                        .orphaned
                        .insert((target, OverrideKey::of(entry)), entry.clone());
                }
                info!(
                    path = %path.display(),
                    orphaned = state.orphaned.len(),
                    "Loaded persisted overrides"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No persisted overrides");
            }
            Err(source) => {
                error!(
                    path = %path.display(),
                    error = %source,
                    "Failed to read persisted overrides"
                );
                return Err(OverrideStoreError::Load { path, source });
            }
        }

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the persisted overrides file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `ops` in order to a session, then persist
    ///
    /// The whole batch is validated first; an invalid op rejects the batch
    /// without applying anything. The session is created on first use, and
    /// its target follows the latest call.
    pub async fn apply_ops(
        &self,
        session_id: &SessionId,
        target: OverrideTarget,
        ops: Vec<OverrideOp>,
    ) -> OverrideStoreResult<()> {
        if session_id.is_empty() {
            return Err(OverrideStoreError::InvalidOp(
                CoreError::ValidationError("empty session id".to_string()),
            ));
        }
        for op in &ops {
            op.validate().map_err(OverrideStoreError::InvalidOp)?;
        }

        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                debug!(session_id = %session_id, target = %target, "Creating override session");
                SessionState::new(target)
            });
        if session.target != target {
            debug!(
                session_id = %session_id,
                from = %session.target,
                to = %target,
                "Session target changed"
            );
            session.target = target;
        }

        let op_count = ops.len();
        for op in ops {
            session.apply(op);
        }
        debug!(
            session_id = %session_id,
            op_count,
            overrides = session.overrides.len(),
            "Applied override ops"
        );

        self.persist(&state).await
    }

    /// A session's overrides as equivalent `set` ops
    pub async fn get_session_overrides(&self, session_id: &SessionId) -> Vec<OverrideOp> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(session_id)
            .map(|session| session.overrides.values().map(Override::to_set_op).collect())
            .unwrap_or_default()
    }

    /// Every live override, tagged with session and target
    pub async fn get_all_overrides(&self) -> Vec<SessionOverride> {
        let state = self.state.lock().await;
        let mut all: Vec<SessionOverride> = state
            .sessions
            .iter()
            .flat_map(|(session_id, session)| {
                session.overrides.values().map(move |entry| SessionOverride {
                    session_id: session_id.clone(),
                    target: session.target,
                    entry: entry.clone(),
                })
            })
            .collect();
        all.sort_by(|a, b| {
            (&a.session_id, &a.entry.instance_id, &a.entry.path).cmp(&(
                &b.session_id,
                &b.entry.instance_id,
                &b.entry.path,
            ))
        });
        all
    }

    /// Live session ids, sorted
    pub async fn session_ids(&self) -> Vec<SessionId> {
        let state = self.state.lock().await;
        let mut ids: Vec<SessionId> = state.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Persisted overrides no live session has claimed yet
    pub async fn get_orphaned_overrides(&self) -> Vec<OrphanedOverride> {
        let state = self.state.lock().await;
        state
            .orphaned
            .iter()
            .map(|((target, _), entry)| OrphanedOverride {
                target: *target,
                entry: entry.clone(),
            })
            .collect()
    }

    /// Drop every unclaimed persisted override, then persist
    pub async fn clear_orphaned_overrides(&self) -> OverrideStoreResult<()> {
        let mut state = self.state.lock().await;
        let cleared = state.orphaned.len();
        state.orphaned.clear();
        info!(cleared, "Cleared orphaned overrides");
        self.persist(&state).await
    }

    /// Move orphaned overrides of `target` whose instance id matches exactly
    /// into `session_id`
    ///
    /// Returns the claimed overrides as `set` ops. An override the session
    /// already holds for the same key is kept and the orphan is discarded.
    /// The session's target becomes `target`, as with `apply_ops`.
    pub async fn claim_orphaned(
        &self,
        session_id: &SessionId,
        target: OverrideTarget,
        instance_ids: &[InstanceId],
    ) -> OverrideStoreResult<Vec<OverrideOp>> {
        let mut state = self.state.lock().await;

        let keys: Vec<(OverrideTarget, OverrideKey)> = state
            .orphaned
            .keys()
            .filter(|(orphan_target, key)| {
                *orphan_target == target && instance_ids.contains(&key.instance_id)
            })
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut claimed = Vec::with_capacity(keys.len());
        let mut taken = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = state.orphaned.remove(&key) {
                taken.push((key.1, entry));
            }
        }

        let session = state
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionState::new(target));
        if session.target != target {
            debug!(
                session_id = %session_id,
                from = %session.target,
                to = %target,
                "Session target changed by claim"
            );
            session.target = target;
        }
        for (key, entry) in taken {
            if session.overrides.contains_key(&key) {
                continue;
            }
            claimed.push(entry.to_set_op());
            session.overrides.insert(key, entry);
        }

        info!(
            session_id = %session_id,
            claimed = claimed.len(),
            "Claimed orphaned overrides"
        );
        self.persist(&state).await?;
        Ok(claimed)
    }

    /// Remove promoted overrides that are still unchanged, then persist
    ///
    /// A key is removed only while its session holds exactly the promoted
    /// override (value, component type and locator). Newer values stay, and
    /// sessions that no longer exist are not recreated. Returns the number of
    /// overrides removed.
    pub async fn clear_promoted(
        &self,
        promoted: &[SessionOverride],
    ) -> OverrideStoreResult<usize> {
        let mut state = self.state.lock().await;

        let mut cleared = 0;
        let mut kept = 0;
        for entry in promoted {
            let Some(session) = state.sessions.get_mut(&entry.session_id) else {
                debug!(session_id = %entry.session_id, "Promoted session is gone");
                continue;
            };
            let key = OverrideKey::of(&entry.entry);
            match session.overrides.get(&key) {
                Some(current) if *current == entry.entry => {
                    session.overrides.remove(&key);
                    cleared += 1;
                }
                Some(_) => {
                    debug!(
                        session_id = %entry.session_id,
                        instance_id = %key.instance_id,
                        path = %key.path,
                        "Override changed since promotion, keeping it"
                    );
                    kept += 1;
                }
                None => {}
            }
        }

        info!(cleared, kept, "Cleared promoted overrides");
        self.persist(&state).await?;
        Ok(cleared)
    }

    /// Drop a session's in-memory state, then persist
    pub async fn clear_session(&self, session_id: &SessionId) -> OverrideStoreResult<()> {
        let mut state = self.state.lock().await;
        match state.sessions.remove(session_id) {
            Some(session) => info!(
                session_id = %session_id,
                dropped = session.overrides.len(),
                "Cleared override session"
            ),
            None => debug!(session_id = %session_id, "Clearing unknown session"),
        }
        self.persist(&state).await
    }

    /// Serialize the full state and atomically replace the overrides file
    async fn persist(&self, state: &OverrideState) -> OverrideStoreResult<()> {
        let document = OverridesDocument::build(state.persisted_entries(), Utc::now());
        let bytes = render_overrides_file(&document)?;

        write_atomically(&self.path, &bytes).await.map_err(|source| {
            let hint = remediation_hint(&source);
            error!(
                path = %self.path.display(),
                error = %source,
                kind = ?source.kind(),
                hint,
                "Failed to persist overrides"
            );
            OverrideStoreError::Persist {
                path: self.path.clone(),
                hint,
                source,
            }
        })?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Persisted overrides");
        Ok(())
    }
}
