//! End-to-end crawl tests against a local mock HTTP server.
//!
//! The crawler is synchronous, so the async mock server runs on an
//! explicitly created tokio runtime that stays alive for the duration of
//! each test.

use spiderling::config::UserAgentConfig;
use spiderling::dedup::HashDetector;
use spiderling::engine::{CrawlContext, Engine};
use spiderling::fetch::{Fetcher, Resource};
use spiderling::frontier::{Frontier, MemoryFrontier};
use spiderling::parse::HtmlParser;
use spiderling::policy::ContentTypePolicy;
use spiderling::politeness::{MemoryThrottle, RobotsCache};
use spiderling::sink::{CountingSink, RecordingErrorSink, ResultSink};
use spiderling::url::NormalizedUrl;
use spiderling::{CrawlError, ErrorKind};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Field order matters: the server must drop (and verify its expectations)
// while the runtime that hosts it is still alive.
struct Harness {
    server: MockServer,
    rt: Runtime,
    frontier: Arc<MemoryFrontier>,
    sink: Arc<CountingSink>,
    errors: Arc<RecordingErrorSink>,
    engine: Engine,
}

impl Harness {
    fn new(delay: Duration, workers: usize) -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());

        let frontier = Arc::new(MemoryFrontier::new());
        let sink = Arc::new(CountingSink::new());
        let errors = Arc::new(RecordingErrorSink::new());
        let ctx = CrawlContext {
            frontier: Arc::clone(&frontier) as Arc<dyn Frontier>,
            robots: Arc::new(RobotsCache::new("Spiderling", delay)),
            throttle: Arc::new(MemoryThrottle::new()),
            detector: Arc::new(HashDetector::new()),
            policy: Arc::new(ContentTypePolicy::new(vec!["text/html".to_string()], true)),
            parsers: vec![Arc::new(HtmlParser::new())],
            sink: Arc::clone(&sink) as _,
            errors: Arc::clone(&errors) as _,
            fetcher: Arc::new(Fetcher::new(&UserAgentConfig::default()).unwrap()),
        };
        let engine = Engine::new(ctx, workers);
        Self {
            server,
            rt,
            frontier,
            sink,
            errors,
            engine,
        }
    }

    fn seed(&self) -> NormalizedUrl {
        NormalizedUrl::parse(&self.server.uri()).unwrap()
    }

    /// Mounts HEAD and GET mocks for one HTML page. `set_body_raw` carries
    /// the content type with the body; setting the body any other way would
    /// reset the header.
    fn page(&self, at: &str, body: &str) {
        self.rt.block_on(async {
            Mock::given(method("HEAD"))
                .and(path(at))
                .respond_with(
                    ResponseTemplate::new(200).insert_header("content-type", "text/html"),
                )
                .mount(&self.server)
                .await;
            Mock::given(method("GET"))
                .and(path(at))
                .respond_with(
                    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html"),
                )
                .mount(&self.server)
                .await;
        });
    }

    /// Mounts a robots.txt body. Without this, the mock server answers 404
    /// and the crawler treats the domain as unrestricted.
    fn robots(&self, body: &str) {
        self.rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/robots.txt"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/plain"),
                )
                .mount(&self.server)
                .await;
        });
    }

    /// Mounts mocks asserting a path is never requested.
    fn never_fetched(&self, at: &str) {
        self.rt.block_on(async {
            for m in ["HEAD", "GET"] {
                Mock::given(method(m))
                    .and(path(at))
                    .respond_with(ResponseTemplate::new(200))
                    .expect(0)
                    .mount(&self.server)
                    .await;
            }
        });
    }
}

#[test]
fn test_basic_crawl_with_repeat_links_and_nofollow() {
    let h = Harness::new(Duration::ZERO, 3);
    // robots.txt intentionally absent: the 404 means everything is allowed.
    h.page(
        "/",
        r#"<a href="/a.html">A</a> <a href="/a.html">A again</a> <a href="/b.html">B</a>"#,
    );
    h.page(
        "/a.html",
        r#"<meta name="robots" content="nofollow"> <a href="/c.html">C</a>"#,
    );
    h.page("/b.html", "<p>leaf</p>");
    h.never_fetched("/c.html");

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 3);
    assert_eq!(h.errors.total(), 0);
    let counters = h.frontier.counters();
    // /a.html twice and /b.html and /c.html once each
    assert_eq!(counters.links, 4);
    // the second /a.html link is a repeat
    assert_eq!(counters.repeats, 1);
}

#[test]
fn test_robots_disallow_is_honored_and_recorded() {
    let h = Harness::new(Duration::ZERO, 2);
    h.robots("User-agent: *\nDisallow: /admin\n");
    h.page(
        "/",
        r#"<a href="/admin/panel">admin</a> <a href="/ok.html">ok</a>"#,
    );
    h.page("/ok.html", "<p>fine</p>");
    h.never_fetched("/admin/panel");

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 2);
    assert_eq!(h.errors.count(ErrorKind::Politeness), 1);
    assert_eq!(h.errors.total(), 1);
}

#[test]
fn test_duplicate_content_dumped_once() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page(
        "/",
        r#"<a href="/x.html">x</a> <a href="/y.html">y</a>"#,
    );
    h.page("/x.html", "<p>identical body</p>");
    h.page("/y.html", "<p>identical body</p>");

    h.engine.run(&[h.seed()]).unwrap();

    // The seed plus whichever of x/y came first; the other is a duplicate.
    assert_eq!(h.sink.pages(), 2);
    assert_eq!(h.errors.count(ErrorKind::Content), 1);
}

#[test]
fn test_byte_distinct_bodies_both_dumped() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page(
        "/",
        r#"<a href="/one.html">1</a> <a href="/two.html">2</a>"#,
    );
    // Both bodies decode to the same pair of replacement characters; only
    // a fingerprint taken over the raw bytes can tell them apart.
    h.rt.block_on(async {
        for (at, body) in [("/one.html", vec![0xFF, 0xFE]), ("/two.html", vec![0xFE, 0xFF])] {
            Mock::given(method("HEAD"))
                .and(path(at))
                .respond_with(
                    ResponseTemplate::new(200).insert_header("content-type", "text/html"),
                )
                .mount(&h.server)
                .await;
            Mock::given(method("GET"))
                .and(path(at))
                .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
                .mount(&h.server)
                .await;
        }
    });

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 3);
    assert_eq!(h.errors.total(), 0);
}

#[test]
fn test_cross_domain_links_stay_home() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page(
        "/",
        r#"<a href="http://elsewhere.invalid/page">away</a> <a href="/here.html">here</a>"#,
    );
    h.page("/here.html", "<p>local</p>");

    h.engine.run(&[h.seed()]).unwrap();

    // The off-domain link is registered but never fetched; had it been
    // fetched, the unresolvable host would have recorded a transport error.
    assert_eq!(h.sink.pages(), 2);
    assert_eq!(h.errors.total(), 0);
    assert_eq!(h.frontier.counters().links, 2);
}

#[test]
fn test_redirect_followed_and_edge_recorded() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page("/", r#"<a href="/moved">moved</a>"#);
    h.rt.block_on(async {
        for m in ["HEAD", "GET"] {
            Mock::given(method(m))
                .and(path("/moved"))
                .respond_with(
                    ResponseTemplate::new(301).insert_header("location", "/target.html"),
                )
                .mount(&h.server)
                .await;
        }
    });
    h.page("/target.html", "<p>landed</p>");

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 2);
    assert_eq!(h.errors.total(), 0);
    assert_eq!(h.frontier.counters().redirects, 1);
}

#[test]
fn test_throttle_spaces_same_domain_requests() {
    let delay = Duration::from_millis(150);
    let h = Harness::new(delay, 2);
    h.page("/", r#"<a href="/p1.html">1</a>"#);
    h.page("/p1.html", r#"<a href="/p2.html">2</a>"#);
    h.page("/p2.html", "<p>end</p>");

    let started = Instant::now();
    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 3);
    // Three content fetches, each at least one delay after the request
    // before it (the robots fetch starts the clock).
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[test]
fn test_crawl_delay_directive_overrides_default() {
    let h = Harness::new(Duration::ZERO, 2);
    h.robots("User-agent: *\nCrawl-delay: 0.2\n");
    h.page("/", r#"<a href="/next.html">next</a>"#);
    h.page("/next.html", "<p>end</p>");

    let started = Instant::now();
    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 2);
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[test]
fn test_non_html_content_not_parsed() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page("/", r#"<a href="/data.json">data</a>"#);
    h.rt.block_on(async {
        Mock::given(method("HEAD"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "application/json"),
            )
            .mount(&h.server)
            .await;
        // Rejected on the HEAD content type, so no GET ever goes out.
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&h.server)
            .await;
    });

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 1);
    // A policy rejection is a skip, not a failure.
    assert_eq!(h.errors.total(), 0);
}

#[test]
fn test_content_type_change_after_head_still_dumped() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page("/", r#"<a href="/report">report</a>"#);
    h.rt.block_on(async {
        Mock::given(method("HEAD"))
            .and(path("/report"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "text/html"),
            )
            .mount(&h.server)
            .await;
        // The GET answers with a type the policy would have rejected at
        // the HEAD stage. The body is already paid for, so it is kept.
        Mock::given(method("GET"))
            .and(path("/report"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"plain text report".to_vec(), "text/plain"),
            )
            .mount(&h.server)
            .await;
    });

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 2);
    assert_eq!(h.errors.total(), 0);
}

#[test]
fn test_fetch_failure_recorded_and_crawl_continues() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page(
        "/",
        r#"<a href="/gone.html">gone</a> <a href="/ok.html">ok</a>"#,
    );
    h.page("/ok.html", "<p>fine</p>");
    h.rt.block_on(async {
        Mock::given(method("HEAD"))
            .and(path("/gone.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&h.server)
            .await;
    });

    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 2);
    assert_eq!(h.errors.count(ErrorKind::Transport), 1);
}

#[test]
fn test_noindex_page_followed_but_not_dumped() {
    let h = Harness::new(Duration::ZERO, 2);
    h.page(
        "/",
        r#"<meta name="robots" content="noindex"> <a href="/kept.html">kept</a>"#,
    );
    h.page("/kept.html", "<p>kept</p>");

    h.engine.run(&[h.seed()]).unwrap();

    // The seed's links are followed, but the seed itself is not dumped.
    assert_eq!(h.sink.pages(), 1);
    assert_eq!(h.errors.total(), 0);
}

#[test]
fn test_stop_before_run_fetches_nothing() {
    let h = Harness::new(Duration::ZERO, 2);
    h.never_fetched("/");
    h.never_fetched("/robots.txt");

    h.engine.stop_handle().stop();
    h.engine.run(&[h.seed()]).unwrap();

    assert_eq!(h.sink.pages(), 0);
    assert_eq!(h.errors.total(), 0);
}

#[test]
fn test_stop_mid_crawl_finishes_in_flight_work() {
    let h = Harness::new(Duration::ZERO, 2);
    h.rt.block_on(async {
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "text/html"),
            )
            .mount(&h.server)
            .await;
        // The GET stalls long enough for the drain request to land while
        // the seed is still in flight.
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(br#"<a href="/after.html">after</a>"#.to_vec(), "text/html")
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&h.server)
            .await;
    });
    h.never_fetched("/after.html");

    let stopper = h.engine.stop_handle();
    thread::scope(|scope| {
        scope.spawn(|| h.engine.run(&[h.seed()]).unwrap());
        thread::sleep(Duration::from_millis(150));
        stopper.stop();
    });

    // The in-flight page completed and its link was discovered, but the
    // drain keeps the link from ever being dispatched.
    assert_eq!(h.sink.pages(), 1);
    assert_eq!(h.errors.total(), 0);
    assert_eq!(h.frontier.counters().links, 1);
}

struct FailingSink;

impl ResultSink for FailingSink {
    fn dump(&self, _resource: &Resource) -> spiderling::Result<()> {
        Err(CrawlError::Io(io::Error::new(
            io::ErrorKind::Other,
            "no space left on device",
        )))
    }
}

#[test]
fn test_sink_failure_drains_crawl() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(br#"<a href="/next.html">next</a>"#.to_vec(), "text/html"),
            )
            .mount(&server)
            .await;
        for m in ["HEAD", "GET"] {
            Mock::given(method(m))
                .and(path("/next.html"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;
        }
    });

    let errors = Arc::new(RecordingErrorSink::new());
    let ctx = CrawlContext {
        frontier: Arc::new(MemoryFrontier::new()),
        robots: Arc::new(RobotsCache::new("Spiderling", Duration::ZERO)),
        throttle: Arc::new(MemoryThrottle::new()),
        detector: Arc::new(HashDetector::new()),
        policy: Arc::new(ContentTypePolicy::new(vec!["text/html".to_string()], true)),
        parsers: vec![Arc::new(HtmlParser::new())],
        sink: Arc::new(FailingSink) as _,
        errors: Arc::clone(&errors) as _,
        fetcher: Arc::new(Fetcher::new(&UserAgentConfig::default()).unwrap()),
    };
    // One worker makes the order deterministic: the dump fails before
    // anything discovered by the seed can be dispatched.
    let engine = Engine::new(ctx, 1);
    let seed = NormalizedUrl::parse(&server.uri()).unwrap();

    engine.run(&[seed]).unwrap();

    // The failure is recorded and the crawl drains instead of crashing;
    // /next.html was discovered but never fetched.
    assert_eq!(errors.count(ErrorKind::Fatal), 1);
    assert_eq!(errors.total(), 1);
}
