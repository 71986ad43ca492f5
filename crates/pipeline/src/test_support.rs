//! In-memory fakes for exercising stages in isolation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use scout_domain::{
    Broker, CampaignRepository, DatasetStats, EnqueueOptions, NotificationSender, PageFetcher,
    Product, ProductData, ProductRepository, ScoreBreakdown, ScoreRecord, ScoreRepository,
    ScoringWeights, ScoutError, ScoutResult, Subscription, SubscriptionRepository, TaskHandler,
    TaskState, WorkerOptions,
};

/// Records enqueued payloads instead of delivering them.
pub struct RecordingBroker {
    pub enqueued: Mutex<Vec<(String, serde_json::Value, EnqueueOptions)>>,
}

impl RecordingBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enqueued: Mutex::new(Vec::new()),
        })
    }

    pub fn on_queue(&self, queue: &str) -> Vec<serde_json::Value> {
        self.enqueued
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _, _)| q == queue)
            .map(|(_, p, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> ScoutResult<Uuid> {
        self.enqueued
            .lock()
            .unwrap()
            .push((queue.to_string(), payload, options));
        Ok(Uuid::new_v4())
    }

    async fn state(&self, task_id: Uuid) -> ScoutResult<TaskState> {
        Err(ScoutError::task_not_found(task_id))
    }

    async fn subscribe(&self, task_id: Uuid) -> ScoutResult<watch::Receiver<TaskState>> {
        Err(ScoutError::task_not_found(task_id))
    }

    async fn register_worker(
        &self,
        _queue: &str,
        _handler: Arc<dyn TaskHandler>,
        _options: WorkerOptions,
    ) -> ScoutResult<()> {
        Ok(())
    }
}

/// HashMap-backed product store with name-keyed upsert.
#[derive(Default)]
pub struct FakeProductRepo {
    next_id: AtomicI64,
    pub products: Mutex<HashMap<i64, Product>>,
}

impl FakeProductRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            products: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_product(product: Product) -> Arc<Self> {
        let repo = Self::new();
        repo.products.lock().unwrap().insert(product.id, product);
        repo
    }
}

pub fn product_fixture(id: i64, name: &str) -> Product {
    Product {
        id,
        name: name.to_string(),
        search_volume: 1500,
        sales_rank: 30,
        competitor_count: 10,
        shipping_cost: 4.0,
        return_rate: 0.05,
        seasonality_variation: 0.2,
        has_restrictions: false,
        selling_price: 50.0,
        product_cost: 20.0,
        fees: 5.0,
        supplier_rating: 4.0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl ProductRepository for FakeProductRepo {
    async fn upsert_by_name(&self, data: &ProductData) -> ScoutResult<Product> {
        let mut products = self.products.lock().unwrap();
        let existing_id = products
            .values()
            .find(|p| p.name == data.name)
            .map(|p| p.id);
        let id = existing_id.unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let created_at = products.get(&id).map(|p| p.created_at).unwrap_or(now);
        let product = Product {
            id,
            name: data.name.clone(),
            search_volume: data.search_volume,
            sales_rank: data.sales_rank,
            competitor_count: data.competitor_count,
            shipping_cost: data.shipping_cost,
            return_rate: data.return_rate,
            seasonality_variation: data.seasonality_variation,
            has_restrictions: data.has_restrictions,
            selling_price: data.selling_price,
            product_cost: data.product_cost,
            fees: data.fees,
            supplier_rating: data.supplier_rating,
            created_at,
            updated_at: now,
        };
        products.insert(id, product.clone());
        Ok(product)
    }

    async fn get_by_id(&self, id: i64) -> ScoutResult<Option<Product>> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn dataset_stats(&self) -> ScoutResult<DatasetStats> {
        let products = self.products.lock().unwrap();
        let max_f = |f: fn(&Product) -> f64| {
            products
                .values()
                .map(f)
                .fold(0.0f64, |acc, v| acc.max(v))
        };
        Ok(DatasetStats {
            max_search_volume: max_f(|p| p.search_volume as f64),
            max_sales_rank: max_f(|p| p.sales_rank as f64),
            max_competitor_count: max_f(|p| p.competitor_count as f64),
            max_shipping_cost: max_f(|p| p.shipping_cost),
            max_return_rate: max_f(|p| p.return_rate),
            max_seasonality_variation: max_f(|p| p.seasonality_variation),
        })
    }
}

#[derive(Default)]
pub struct FakeScoreRepo {
    pub saved: Mutex<Vec<ScoreRecord>>,
    pub weights: Mutex<ScoringWeights>,
}

impl FakeScoreRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ScoreRepository for FakeScoreRepo {
    async fn save_score(
        &self,
        product_id: i64,
        breakdown: &ScoreBreakdown,
    ) -> ScoutResult<ScoreRecord> {
        let mut saved = self.saved.lock().unwrap();
        let record = ScoreRecord {
            id: saved.len() as i64 + 1,
            product_id,
            scores: breakdown.scores,
            final_score: breakdown.final_score,
            created_at: Utc::now(),
        };
        saved.push(record.clone());
        Ok(record)
    }

    async fn latest_for_product(&self, product_id: i64) -> ScoutResult<Option<ScoreRecord>> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.product_id == product_id)
            .cloned())
    }

    async fn current_weights(&self) -> ScoutResult<ScoringWeights> {
        Ok(self.weights.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeCampaignRepo {
    pub qualifying: Mutex<HashMap<Uuid, HashMap<i64, f64>>>,
}

impl FakeCampaignRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CampaignRepository for FakeCampaignRepo {
    async fn add_qualifying(
        &self,
        campaign_id: Uuid,
        product_id: i64,
        score: f64,
    ) -> ScoutResult<()> {
        self.qualifying
            .lock()
            .unwrap()
            .entry(campaign_id)
            .or_default()
            .entry(product_id)
            .or_insert(score);
        Ok(())
    }

    async fn qualifying_count(&self, campaign_id: Uuid) -> ScoutResult<u64> {
        Ok(self
            .qualifying
            .lock()
            .unwrap()
            .get(&campaign_id)
            .map(|m| m.len() as u64)
            .unwrap_or(0))
    }
}

pub struct FakeSubscriptionRepo {
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub fail: bool,
}

impl FakeSubscriptionRepo {
    pub fn with(subscriptions: Vec<Subscription>) -> Arc<Self> {
        Arc::new(Self {
            subscriptions: Mutex::new(subscriptions),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            subscriptions: Mutex::new(Vec::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl SubscriptionRepository for FakeSubscriptionRepo {
    async fn active_for_product(&self, product_id: i64) -> ScoutResult<Vec<Subscription>> {
        if self.fail {
            return Err(ScoutError::database_error("alerts table unavailable"));
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.product_id == product_id && s.active)
            .cloned()
            .collect())
    }
}

/// Sender that records deliveries and can be told to fail for certain users.
pub struct FakeSender {
    pub sent: Mutex<Vec<(i64, f64)>>,
    pub fail_for_users: Vec<i64>,
}

impl FakeSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for_users: Vec::new(),
        })
    }

    pub fn failing_for(users: Vec<i64>) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for_users: users,
        })
    }
}

#[async_trait]
impl NotificationSender for FakeSender {
    async fn send(
        &self,
        subscription: &Subscription,
        _product: &Product,
        score: f64,
    ) -> ScoutResult<()> {
        if self.fail_for_users.contains(&subscription.user_id) {
            return Err(ScoutError::Notification("channel rejected".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscription.user_id, score));
        Ok(())
    }
}

/// Serves canned pages by URL; unknown URLs are a network error.
pub struct FakeFetcher {
    pub pages: Mutex<HashMap<String, String>>,
}

impl FakeFetcher {
    pub fn with(pages: HashMap<String, String>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages),
        })
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> ScoutResult<String> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ScoutError::network_error(format!("no route to {url}")))
    }
}
