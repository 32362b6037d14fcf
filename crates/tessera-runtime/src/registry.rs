//! Agent 注册中心
//! Agent registry
//!
//! Owns every agent hosted on this node, allocates identifiers, and keeps
//! the cluster-wide [`LocationStore`] in step with local starts and stops.
//!
//! # 示例
//! # Example
//!
//! ```rust,ignore
//! let registry = AgentRegistry::new("10.0.0.1", pool, store);
//! registry.register_factory(Arc::new(FnAgentFactory::new(class.clone(), || Echo)));
//!
//! let aid = registry.start(&class, "echo", AgentInitArgs::new()).await?;
//! let workers = registry.start_many(&class, "Worker", 3, AgentInitArgs::new()).await?;
//! registry.stop(&aid).await?;
//! ```

use crate::mailbox::Mailbox;
use crate::pool::WorkerPool;
use crate::router::{MessageRouter, RouterLink};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock, Weak};
use tessera_kernel::agent::{AgentError, AgentFactory, AgentInitArgs};
use tessera_kernel::location::{LocationStore, LocationStoreError, RunningAgentRecord};
use tessera_kernel::{AgentClass, Aid};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// 错误
// ============================================================================

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The name is already taken on this node.
    #[error("Naming conflict: {0} is already registered")]
    NamingConflict(Aid),

    #[error("Agent not found: {0}")]
    NotFound(Aid),

    #[error("Unknown agent class: {0}")]
    UnknownAgentClass(AgentClass),

    #[error("Invalid agent name: '{0}'")]
    InvalidName(String),

    #[error("Failed to start {aid}: {source}")]
    InitFailed {
        aid: Aid,
        #[source]
        source: AgentError,
    },

    #[error(transparent)]
    LocationStore(#[from] LocationStoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// ============================================================================
// 位置
// ============================================================================

/// Where a receiver lives, as seen from this node.
#[derive(Debug, Clone)]
pub enum AgentLocation {
    Local(Arc<Mailbox>),
    Remote { node: String },
}

enum Slot {
    /// Name reserved; `init` has not returned yet.
    Starting,
    Running {
        mailbox: Arc<Mailbox>,
        record: RunningAgentRecord,
    },
}

/// 注册中心统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStats {
    /// 运行中的 Agent 数
    pub running: usize,
    /// 正在启动的 Agent 数
    pub starting: usize,
    /// 已注册工厂数
    pub factory_count: usize,
    /// 最早启动时间戳 (Unix milliseconds)
    pub earliest_start: Option<u64>,
    /// 最新启动时间戳 (Unix milliseconds)
    pub latest_start: Option<u64>,
}

// ============================================================================
// 注册中心
// ============================================================================

pub struct AgentRegistry {
    node: String,
    factories: DashMap<AgentClass, Arc<dyn AgentFactory>>,
    agents: DashMap<Aid, Slot>,
    store: Arc<dyn LocationStore>,
    pool: WorkerPool,
    router: RouterLink,
}

impl AgentRegistry {
    pub fn new(node: impl Into<String>, pool: WorkerPool, store: Arc<dyn LocationStore>) -> Self {
        Self {
            node: node.into(),
            factories: DashMap::new(),
            agents: DashMap::new(),
            store,
            pool,
            router: Arc::new(OnceLock::new()),
        }
    }

    /// Address of the node this registry hosts agents for.
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Connects agent contexts to the node's router. Only the first call
    /// has an effect.
    pub(crate) fn bind_router(&self, router: Weak<MessageRouter>) {
        let _ = self.router.set(router);
    }

    // ========================================================================
    // 工厂管理
    // ========================================================================

    /// 注册 Agent 工厂
    /// Makes a class deployable on this node, replacing any previous factory
    /// for the same class.
    pub fn register_factory(&self, factory: Arc<dyn AgentFactory>) {
        let class = factory.agent_class().clone();
        debug!(agent_class = %class, "Registered agent factory");
        self.factories.insert(class, factory);
    }

    pub fn unregister_factory(&self, class: &AgentClass) -> bool {
        self.factories.remove(class).is_some()
    }

    /// 列出可部署的类别
    pub fn agent_classes(&self) -> Vec<AgentClass> {
        let mut classes: Vec<AgentClass> = self.factories.iter().map(|e| e.key().clone()).collect();
        classes.sort();
        classes
    }

    // ========================================================================
    // Agent 生命周期
    // ========================================================================

    /// 启动 Agent
    /// Instantiates `class` as `name` on this node.
    ///
    /// The name is reserved before the factory runs, so of two concurrent
    /// starts under one name exactly one succeeds and the other gets
    /// [`RegistryError::NamingConflict`]. The agent becomes reachable only
    /// after `init` has returned and its location is published.
    pub async fn start(
        &self,
        class: &AgentClass,
        name: &str,
        args: AgentInitArgs,
    ) -> RegistryResult<Aid> {
        if name.is_empty() {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let factory = self
            .factories
            .get(class)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| RegistryError::UnknownAgentClass(class.clone()))?;

        let aid = Aid::new(self.node.clone(), class, name);
        let reservation = Reservation::claim(&self.agents, aid)?;
        let aid = reservation.aid.clone();

        match self.launch(factory.as_ref(), &aid, args).await {
            Ok((mailbox, record)) => {
                reservation.commit(Slot::Running { mailbox, record });
                info!(aid = %aid, "Agent started");
                Ok(aid)
            }
            Err(e) => {
                warn!(aid = %aid, error = %e, "Agent failed to start");
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        factory: &dyn AgentFactory,
        aid: &Aid,
        args: AgentInitArgs,
    ) -> RegistryResult<(Arc<Mailbox>, RunningAgentRecord)> {
        let init_failed = |source| RegistryError::InitFailed {
            aid: aid.clone(),
            source,
        };

        let agent = factory.create().await.map_err(init_failed)?;
        let mailbox = Mailbox::new(aid.clone(), agent, self.pool.clone(), Arc::clone(&self.router));
        mailbox.initialize(args).await.map_err(init_failed)?;

        let record = RunningAgentRecord::new(aid.clone(), self.node.clone());
        if let Err(e) = self.store.put(record.clone()).await {
            mailbox.shutdown().await;
            return Err(e.into());
        }
        Ok((mailbox, record))
    }

    /// 批量启动
    /// Starts `quantity` instances named by [`instance_names`]. Stops at the
    /// first failure; instances started before it keep running.
    pub async fn start_many(
        &self,
        class: &AgentClass,
        base: &str,
        quantity: usize,
        args: AgentInitArgs,
    ) -> RegistryResult<Vec<Aid>> {
        let mut started = Vec::with_capacity(quantity);
        for name in instance_names(base, quantity) {
            started.push(self.start(class, &name, args.clone()).await?);
        }
        Ok(started)
    }

    /// 停止 Agent
    /// Stops a local agent. Lookups fail with `NotFound` from the moment this
    /// is called; the in-flight handler, if any, finishes before `terminate`.
    pub async fn stop(&self, aid: &Aid) -> RegistryResult<()> {
        let removed = self
            .agents
            .remove_if(aid, |_, slot| matches!(slot, Slot::Running { .. }));
        let Some((_, Slot::Running { mailbox, .. })) = removed else {
            return Err(RegistryError::NotFound(aid.clone()));
        };

        let discarded = mailbox.shutdown().await;
        self.store.remove(aid).await?;
        info!(aid = %aid, discarded, "Agent stopped");
        Ok(())
    }

    /// 关闭所有 Agent
    pub async fn shutdown_all(&self) -> Vec<Aid> {
        let aids: Vec<Aid> = self.agents.iter().map(|e| e.key().clone()).collect();
        let mut stopped = Vec::with_capacity(aids.len());
        for aid in aids {
            match self.stop(&aid).await {
                Ok(()) => stopped.push(aid),
                Err(RegistryError::NotFound(_)) => {}
                Err(e) => {
                    warn!(aid = %aid, error = %e, "Failed to stop agent cleanly");
                    stopped.push(aid);
                }
            }
        }
        stopped
    }

    // ========================================================================
    // 查找
    // ========================================================================

    /// 查找 Agent
    /// Local table first, then the distributed store. A store record that
    /// points at this node without a local entry is stale and reported as
    /// `NotFound`.
    pub async fn lookup(&self, aid: &Aid) -> RegistryResult<AgentLocation> {
        let local = self.agents.get(aid).map(|slot| match slot.value() {
            Slot::Running { mailbox, .. } => Some(Arc::clone(mailbox)),
            Slot::Starting => None,
        });
        match local {
            Some(Some(mailbox)) => return Ok(AgentLocation::Local(mailbox)),
            Some(None) => return Err(RegistryError::NotFound(aid.clone())),
            None => {}
        }

        match self.store.get(aid).await? {
            Some(record) if record.location != self.node => Ok(AgentLocation::Remote {
                node: record.location,
            }),
            _ => Err(RegistryError::NotFound(aid.clone())),
        }
    }

    /// The local mailbox of a running agent.
    pub fn local(&self, aid: &Aid) -> Option<Arc<Mailbox>> {
        self.agents.get(aid).and_then(|slot| match slot.value() {
            Slot::Running { mailbox, .. } => Some(Arc::clone(mailbox)),
            Slot::Starting => None,
        })
    }

    pub fn contains(&self, aid: &Aid) -> bool {
        self.local(aid).is_some()
    }

    /// 列出本节点运行中的 Agent
    pub fn running(&self) -> Vec<RunningAgentRecord> {
        let mut records: Vec<RunningAgentRecord> = self
            .agents
            .iter()
            .filter_map(|e| match e.value() {
                Slot::Running { record, .. } => Some(record.clone()),
                Slot::Starting => None,
            })
            .collect();
        records.sort_by(|a, b| a.aid.cmp(&b.aid));
        records
    }

    /// 获取统计信息
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            factory_count: self.factories.len(),
            ..RegistryStats::default()
        };
        for entry in self.agents.iter() {
            match entry.value() {
                Slot::Starting => stats.starting += 1,
                Slot::Running { record, .. } => {
                    stats.running += 1;
                    let at = record.started_at;
                    stats.earliest_start = Some(stats.earliest_start.map_or(at, |e| e.min(at)));
                    stats.latest_start = Some(stats.latest_start.map_or(at, |l| l.max(at)));
                }
            }
        }
        stats
    }
}

/// A name held in `Slot::Starting`. Dropping it without
/// [`commit`](Self::commit) releases the name, including when the `start`
/// future is cancelled mid-launch.
struct Reservation<'a> {
    agents: &'a DashMap<Aid, Slot>,
    aid: Aid,
    committed: bool,
}

impl<'a> Reservation<'a> {
    fn claim(agents: &'a DashMap<Aid, Slot>, aid: Aid) -> RegistryResult<Self> {
        match agents.entry(aid.clone()) {
            Entry::Occupied(_) => Err(RegistryError::NamingConflict(aid)),
            Entry::Vacant(slot) => {
                slot.insert(Slot::Starting);
                Ok(Self {
                    agents,
                    aid,
                    committed: false,
                })
            }
        }
    }

    fn commit(mut self, slot: Slot) {
        self.agents.insert(self.aid.clone(), slot);
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.agents
                .remove_if(&self.aid, |_, slot| matches!(slot, Slot::Starting));
            debug!(aid = %self.aid, "Released name reservation");
        }
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("node", &self.node)
            .field("agents", &self.agents.len())
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// 实例命名
/// Names for `quantity` instances under `base`: exactly `base` for one,
/// `base1..baseN` for more, none for zero.
pub fn instance_names(base: &str, quantity: usize) -> Vec<String> {
    match quantity {
        0 => Vec::new(),
        1 => vec![base.to_string()],
        n => (1..=n).map(|i| format!("{base}{i}")).collect(),
    }
}
