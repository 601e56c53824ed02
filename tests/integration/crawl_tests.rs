//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a mock MyBB forum and exercise the
//! thread crawler and range runner end-to-end against an in-memory store.

use forum_archiver::config::Config;
use forum_archiver::crawler::{Fetcher, RangeRunner, ThreadCrawler};
use forum_archiver::state::{AbortReason, ThreadState};
use forum_archiver::storage::{
    PostRecord, RunRecord, RunStatus, SqliteStorage, Storage, StorageResult, ThreadRecord,
    UserRecord,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A post on a mock page: id, author, body html
type MockPost<'a> = (i64, &'a str, &'a str);

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.forum.base_url = base_url.to_string();
    config.range.start_tid = 1;
    config.range.end_tid = 1;
    config.fetch.request_delay_secs = 0.0;
    config.fetch.backoff_base_secs = 0.0;
    config.fetch.max_retries = 1;
    config.fetch.timeout_secs = 5;
    config.fetch.user_agent = "ArchiverTest/1.0".to_string();
    config
}

/// Renders a MyBB-style thread page
fn thread_page(tid: i64, title: &str, pages: u32, posts: &[MockPost<'_>]) -> String {
    let pagination = if pages > 1 {
        let links: String = (2..=pages)
            .map(|n| {
                format!(
                    r#"<a href="showthread.php?tid={}&amp;page={}" class="pagination_page">{}</a>"#,
                    tid, n, n
                )
            })
            .collect();
        format!(
            r#"<div class="pagination"><span class="pages">Pages ({}):</span> <span class="pagination_current">1</span> {}</div>"#,
            pages, links
        )
    } else {
        String::new()
    };

    let posts_html: String = posts
        .iter()
        .map(|(id, author, body)| {
            format!(
                r#"<div class="post" id="post_{id}">
  <div class="post_author">
    <span class="largetext"><a href="member.php?action=profile&amp;uid=1">{author}</a></span>
    <div class="author_statistics">Posts: 1,234<br /> Threads: 5<br /> Joined: Dec 2021</div>
  </div>
  <div class="post_head"><span class="post_date">09-Dec-2021, 10:06 PM</span></div>
  <div class="post_body" id="pid_{id}">{body}</div>
</div>"#,
                id = id,
                author = author,
                body = body
            )
        })
        .collect();

    format!(
        r#"<html><head><title>{title}</title></head><body>
<div class="navigation"><a href="index.php">Test Forum</a> &rsaquo; <a href="forumdisplay.php?fid=2">General</a> &rsaquo; <span class="active">{title}</span></div>
{pagination}
<div id="posts">{posts}</div>
</body></html>"#,
        title = title,
        pagination = pagination,
        posts = posts_html
    )
}

fn quote_of(pid: i64, quoted: &str, reply: &str) -> String {
    format!(
        r#"<blockquote class="mycode_quote"><cite><span>Quote:<a href="showthread.php?pid={pid}#pid{pid}" class="quick_jump"></a></span></cite>{quoted}</blockquote>{reply}"#,
        pid = pid,
        quoted = quoted,
        reply = reply
    )
}

async fn mount_page(server: &MockServer, tid: i64, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(query_param("tid", tid.to_string()))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, tid: i64, page: u32, status: u16, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(query_param("tid", tid.to_string()))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected)
        .mount(server)
        .await;
}

/// Cancels `cancel` once the server has answered a request for `tid`/`page`
async fn cancel_once_served(
    server: &MockServer,
    cancel: &CancellationToken,
    tid: i64,
    page: u32,
) {
    let tid = tid.to_string();
    let page = page.to_string();
    for _ in 0..500 {
        let requests = server.received_requests().await.unwrap_or_default();
        let served = requests.iter().any(|request| {
            let pairs: HashMap<String, String> =
                request.url.query_pairs().into_owned().collect();
            pairs.get("tid") == Some(&tid) && pairs.get("page") == Some(&page)
        });
        if served {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
}

fn seed_thread(storage: &mut impl Storage, tid: i64) {
    storage
        .upsert_thread(&ThreadRecord {
            thread_id: tid,
            title: "Already archived".to_string(),
            board_path: None,
            created_at: None,
        })
        .unwrap();
}

#[tokio::test]
async fn test_multi_page_thread() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    mount_page(
        &server,
        5,
        1,
        thread_page(
            5,
            "Welcome",
            3,
            &[(101, "alice", "Hello everyone"), (102, "bob", "Hi alice")],
        ),
    )
    .await;
    mount_page(
        &server,
        5,
        2,
        thread_page(5, "Welcome", 3, &[(103, "carol", "Late to the party")]),
    )
    .await;
    let reply = quote_of(101, "Hello everyone", "Welcome back");
    mount_page(
        &server,
        5,
        3,
        thread_page(5, "Welcome", 3, &[(104, "bob", reply.as_str())]),
    )
    .await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(5)
        .await;

    assert!(report.is_success());
    assert_eq!(report.final_state, ThreadState::Done);
    assert_eq!(report.reason, None);
    assert_eq!(report.page_count, 3);
    assert_eq!(report.pages_processed, 3);
    assert_eq!(report.posts_saved, 4);

    let thread = storage.get_thread(5).unwrap().unwrap();
    assert_eq!(thread.title, "Welcome");
    assert_eq!(thread.board_path.as_deref(), Some("Test Forum › General"));
    assert!(thread.created_at.is_some());

    let posts = storage.get_posts_for_thread(5).unwrap();
    let ids: Vec<_> = posts.iter().map(|p| p.post_id).collect();
    assert_eq!(ids, vec![101, 102, 103, 104]);

    let reply = storage.get_post(104).unwrap().unwrap();
    assert_eq!(reply.replies_to_post_id, Some(101));
    assert_eq!(reply.body.as_deref(), Some("Welcome back"));

    let alice = storage.get_user("alice").unwrap().unwrap();
    assert_eq!(alice.post_count, Some(1234));
    assert_eq!(alice.thread_count, Some(5));
    assert!(alice.joined_at.is_some());
    assert_eq!(storage.count_users().unwrap(), 3);
}

#[tokio::test]
async fn test_not_found_thread_is_not_stored() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    mount_page(
        &server,
        9,
        1,
        r#"<html><head><title>Test Forum</title></head><body>
<div class="error"><strong>The following errors occurred:</strong>
<ul><li>The specified thread does not exist.</li></ul></div>
</body></html>"#
            .to_string(),
    )
    .await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(9)
        .await;

    assert!(!report.is_success());
    assert_eq!(report.final_state, ThreadState::Aborted);
    assert_eq!(report.reason, Some(AbortReason::NotFound));
    assert!(!storage.thread_exists(9).unwrap());
}

#[tokio::test]
async fn test_untitled_page_persists_nothing() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    let page = thread_page(4, "Ignored", 1, &[(40, "alice", "hello")])
        .replace("<title>Ignored</title>", "");
    mount_page(&server, 4, 1, page).await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(4)
        .await;

    assert_eq!(report.reason, Some(AbortReason::NoTitle));
    assert_eq!(storage.count_threads().unwrap(), 0);
    assert_eq!(storage.count_users().unwrap(), 0);
    assert_eq!(storage.count_posts().unwrap(), 0);
}

#[tokio::test]
async fn test_titled_page_without_posts() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    mount_page(&server, 6, 1, thread_page(6, "Empty thread", 1, &[])).await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(6)
        .await;

    assert!(!report.is_success());
    assert_eq!(report.final_state, ThreadState::Aborted);
    assert_eq!(report.reason, Some(AbortReason::NoValidPosts));

    // The thread row marks it as done for the next run
    assert!(storage.thread_exists(6).unwrap());
    assert_eq!(storage.count_users().unwrap(), 0);
    assert_eq!(storage.count_posts().unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_thread() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.fetch.max_retries = 2;

    mount_status(&server, 3, 1, 503, 2).await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(3)
        .await;

    assert_eq!(report.reason, Some(AbortReason::Unreachable));
    assert!(!storage.thread_exists(3).unwrap());
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    let reply = quote_of(70, "first", "second");
    mount_page(
        &server,
        7,
        1,
        thread_page(7, "Twice", 1, &[(70, "alice", "first"), (71, "bob", reply.as_str())]),
    )
    .await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();

    ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(7)
        .await;
    let first_posts = storage.get_posts_for_thread(7).unwrap();
    let first_thread = storage.get_thread(7).unwrap();
    let first_alice = storage.get_user("alice").unwrap();
    let first_bob = storage.get_user("bob").unwrap();
    assert!(first_thread.is_some());
    assert!(first_alice.is_some());
    assert!(first_bob.is_some());

    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(7)
        .await;
    assert!(report.is_success());

    assert_eq!(storage.count_threads().unwrap(), 1);
    assert_eq!(storage.count_users().unwrap(), 2);
    assert_eq!(storage.count_posts().unwrap(), 2);
    assert_eq!(storage.count_replies().unwrap(), 1);
    assert_eq!(storage.get_posts_for_thread(7).unwrap(), first_posts);
    assert_eq!(storage.get_thread(7).unwrap(), first_thread);
    assert_eq!(storage.get_user("alice").unwrap(), first_alice);
    assert_eq!(storage.get_user("bob").unwrap(), first_bob);
}

#[tokio::test]
async fn test_retry_until_success() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.fetch.max_retries = 3;

    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(query_param("tid", "8"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, 8, 1, thread_page(8, "Flaky", 1, &[(80, "alice", "made it")])).await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(8)
        .await;

    assert!(report.is_success());
    assert_eq!(storage.get_post(80).unwrap().unwrap().body.as_deref(), Some("made it"));
}

#[tokio::test]
async fn test_later_page_failure_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let config = create_test_config(&server.uri());

    mount_page(
        &server,
        11,
        1,
        thread_page(11, "Long thread", 3, &[(110, "alice", "one"), (111, "bob", "two")]),
    )
    .await;
    mount_status(&server, 11, 2, 500, 1).await;
    mount_status(&server, 11, 3, 200, 0).await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(11)
        .await;

    assert!(report.is_success());
    assert_eq!(report.final_state, ThreadState::Done);
    assert_eq!(report.reason, Some(AbortReason::PageFailure));
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.posts_saved, 2);
    assert_eq!(storage.get_posts_for_thread(11).unwrap().len(), 2);
}

#[tokio::test]
async fn test_cookies_sent_with_requests() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.fetch.cookies = Some("sid=xyz; mybbuser=1_abc".to_string());

    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(header("cookie", "mybbuser=1_abc; sid=xyz"))
        .and(header("user-agent", "ArchiverTest/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(thread_page(12, "Members only", 1, &[(120, "alice", "secret")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    let report = ThreadCrawler::new(&config, &fetcher, &mut storage)
        .crawl(12)
        .await;

    assert!(report.is_success());
}

#[tokio::test]
async fn test_runner_skips_archived_threads() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.range.start_tid = 1;
    config.range.end_tid = 2;

    mount_status(&server, 1, 1, 200, 0).await;
    mount_page(&server, 2, 1, thread_page(2, "Fresh", 1, &[(20, "alice", "new")])).await;

    let mut storage = SqliteStorage::open_in_memory().unwrap();
    seed_thread(&mut storage, 1);

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut runner = RangeRunner::new(config, fetcher, storage);
    let summary = runner
        .run(&CancellationToken::new(), "test-hash")
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.crawled, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);

    let storage = runner.close();
    assert_eq!(storage.get_thread(1).unwrap().unwrap().title, "Already archived");
    assert!(storage.thread_exists(2).unwrap());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!((run.start_tid, run.end_tid), (1, 2));
}

/// Store wrapper that counts existence checks per thread id
struct CountingStorage {
    inner: SqliteStorage,
    checks: RefCell<HashMap<i64, u32>>,
}

impl CountingStorage {
    fn new(inner: SqliteStorage) -> Self {
        Self {
            inner,
            checks: RefCell::new(HashMap::new()),
        }
    }

    fn checks_for(&self, thread_id: i64) -> u32 {
        self.checks.borrow().get(&thread_id).copied().unwrap_or(0)
    }
}

impl Storage for CountingStorage {
    fn create_run(
        &mut self,
        config_hash: &str,
        start_tid: i64,
        end_tid: i64,
    ) -> StorageResult<i64> {
        self.inner.create_run(config_hash, start_tid, end_tid)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.inner.finish_run(run_id, status)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn thread_exists(&self, thread_id: i64) -> StorageResult<bool> {
        *self.checks.borrow_mut().entry(thread_id).or_insert(0) += 1;
        self.inner.thread_exists(thread_id)
    }

    fn upsert_thread(&mut self, thread: &ThreadRecord) -> StorageResult<()> {
        self.inner.upsert_thread(thread)
    }

    fn get_thread(&self, thread_id: i64) -> StorageResult<Option<ThreadRecord>> {
        self.inner.get_thread(thread_id)
    }

    fn upsert_user(&mut self, user: &UserRecord) -> StorageResult<()> {
        self.inner.upsert_user(user)
    }

    fn get_user(&self, username: &str) -> StorageResult<Option<UserRecord>> {
        self.inner.get_user(username)
    }

    fn upsert_post(&mut self, post: &PostRecord) -> StorageResult<()> {
        self.inner.upsert_post(post)
    }

    fn get_post(&self, post_id: i64) -> StorageResult<Option<PostRecord>> {
        self.inner.get_post(post_id)
    }

    fn get_posts_for_thread(&self, thread_id: i64) -> StorageResult<Vec<PostRecord>> {
        self.inner.get_posts_for_thread(thread_id)
    }

    fn count_threads(&self) -> StorageResult<u64> {
        self.inner.count_threads()
    }

    fn count_users(&self) -> StorageResult<u64> {
        self.inner.count_users()
    }

    fn count_posts(&self) -> StorageResult<u64> {
        self.inner.count_posts()
    }

    fn count_replies(&self) -> StorageResult<u64> {
        self.inner.count_replies()
    }
}

#[tokio::test]
async fn test_runner_checks_each_thread_once() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.range.start_tid = 1;
    config.range.end_tid = 3;

    mount_status(&server, 1, 1, 404, 1).await;
    mount_status(&server, 2, 1, 200, 0).await;
    mount_status(&server, 3, 1, 404, 1).await;

    let mut inner = SqliteStorage::open_in_memory().unwrap();
    seed_thread(&mut inner, 2);

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut runner = RangeRunner::new(config, fetcher, CountingStorage::new(inner));
    let summary = runner
        .run(&CancellationToken::new(), "hash")
        .await
        .unwrap();

    assert_eq!(summary.crawled, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 1);

    for tid in 1..=3 {
        assert_eq!(runner.storage().checks_for(tid), 1, "thread {}", tid);
    }
}

#[tokio::test]
async fn test_cancelled_run_fetches_nothing() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.range.end_tid = 10;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let mut runner = RangeRunner::new(config, fetcher, SqliteStorage::open_in_memory().unwrap());
    let summary = runner.run(&cancel, "hash").await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.crawled, 0);
    assert_eq!(summary.skipped, 0);

    let storage = runner.close();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    assert!(run.finished_at.is_some());
    storage.close().unwrap();
}

#[tokio::test]
async fn test_cancel_mid_run_finishes_current_thread() {
    let server = MockServer::start().await;
    let mut config = create_test_config(&server.uri());
    config.range.end_tid = 3;
    config.fetch.request_delay_secs = 0.3;

    mount_page(
        &server,
        1,
        1,
        thread_page(1, "In flight", 2, &[(11, "alice", "page one")]),
    )
    .await;
    mount_page(
        &server,
        1,
        2,
        thread_page(1, "In flight", 2, &[(12, "bob", "page two")]),
    )
    .await;
    for tid in [2, 3] {
        Mock::given(method("GET"))
            .and(path("/showthread.php"))
            .and(query_param("tid", tid.to_string()))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let cancel = CancellationToken::new();
    let fetcher = Fetcher::new(&config.fetch).unwrap();
    let storage = SqliteStorage::open_in_memory().unwrap();
    let mut runner = RangeRunner::new(config, fetcher, storage);

    let (result, ()) = tokio::join!(
        runner.run(&cancel, "hash"),
        cancel_once_served(&server, &cancel, 1, 1)
    );
    let summary = result.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.crawled, 1);
    assert_eq!(summary.succeeded, 1);

    let storage = runner.close();
    let post_ids: Vec<i64> = storage
        .get_posts_for_thread(1)
        .unwrap()
        .iter()
        .map(|post| post.post_id)
        .collect();
    assert_eq!(post_ids, vec![11, 12]);
    assert!(storage.get_thread(2).unwrap().is_none());
    assert!(storage.get_thread(3).unwrap().is_none());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    storage.close().unwrap();
}
