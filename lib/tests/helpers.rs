use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;
use tokio::sync::Notify;

use ledger_xrp::{
    apdu::{
        frame::{Frame, Response},
        status::{ErrorKind, StatusTable},
    },
    DeviceHandle, Exchange,
};

/// Scripted device response
#[allow(unused)]
pub enum Step {
    /// Respond immediately
    Reply(Vec<u8>),
    /// Respond once notified (simulates user interaction)
    Gated(Arc<Notify>, Vec<u8>),
    /// Never respond
    Hang,
    /// Respond after a delay
    Delayed(Duration, Vec<u8>),
}

/// Requests received by a [MockTransport]
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Vec<u8>>>>);

#[allow(unused)]
impl RequestLog {
    /// Fetch decoded request frames
    pub fn frames(&self) -> Vec<Frame> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|r| Frame::parse(r).expect("invalid request frame"))
            .collect()
    }

    /// Number of requests received
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Mock transport replaying scripted responses in order
pub struct MockTransport {
    steps: VecDeque<Step>,
    log: RequestLog,
}

#[async_trait]
impl Exchange for MockTransport {
    async fn exchange(
        &mut self,
        req: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, ledger_lib::Error> {
        debug!("Mock request: {:02x?}", req);

        self.log.0.lock().unwrap().push(req.to_vec());

        match self.steps.pop_front() {
            Some(Step::Reply(r)) => Ok(r),
            Some(Step::Gated(n, r)) => {
                n.notified().await;
                Ok(r)
            }
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Delayed(d, r)) => {
                tokio::time::sleep(d).await;
                Ok(r)
            }
            // No scripted response
            None => Err(ledger_lib::Error::Unknown),
        }
    }
}

/// Setup logging and a device handle over a scripted mock transport
pub fn setup(steps: Vec<Step>) -> (DeviceHandle<MockTransport>, RequestLog) {
    // Setup logging
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());

    let log = RequestLog::default();
    let t = MockTransport {
        steps: steps.into(),
        log: log.clone(),
    };

    (DeviceHandle::from(t), log)
}

/// Build a response with the provided status word
#[allow(unused)]
pub fn reply(data: &[u8], status: u16) -> Step {
    Step::Reply(Response::new(data.to_vec(), status).encode())
}

/// Build a successful response
#[allow(unused)]
pub fn ok(data: &[u8]) -> Step {
    reply(data, 0x9000)
}

/// Build a response released once `user` is notified
#[allow(unused)]
pub fn gated(user: &Arc<Notify>, data: &[u8], status: u16) -> Step {
    Step::Gated(user.clone(), Response::new(data.to_vec(), status).encode())
}

/// Build an error response using the status word the current firmware
/// reports for `kind`
#[allow(unused)]
pub fn reply_kind(kind: ErrorKind) -> Step {
    let sw = StatusTable::Current
        .status_word(kind)
        .expect("no status word for error kind");
    reply(&[], sw)
}

/// Build a successful response released after `delay`
#[allow(unused)]
pub fn delayed(delay: Duration, data: &[u8]) -> Step {
    Step::Delayed(delay, Response::new(data.to_vec(), 0x9000).encode())
}
