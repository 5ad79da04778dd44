// Copyright (c) 2025, VIMA contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Protocol link to out-of-process segmentation and density workers.
//!
//! The core only speaks the wire records: it sends fire-and-forget
//! requests over an outbound channel and drains inbound responses each
//! frame, correlating by `request_id`. There is no timeout, retry, or
//! cancellation; late or missing responses are tolerated. The workers
//! themselves live outside this crate and attach to a [`WorkerEndpoint`].

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

/// Outbound request record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    /// Segment the region inside `box_px` (absolute pixels, x0 y0 x1 y1).
    Segment {
        request_id: u64,
        #[serde(rename = "box")]
        box_px: [f64; 4],
        width: u32,
        height: u32,
    },
    /// Estimate an object-density grid for the whole frame.
    Density {
        request_id: u64,
        width: u32,
        height: u32,
    },
}

impl WorkerRequest {
    pub fn request_id(&self) -> u64 {
        match self {
            WorkerRequest::Segment { request_id, .. } | WorkerRequest::Density { request_id, .. } => {
                *request_id
            }
        }
    }
}

/// Inbound response record. Which fields are present depends on the
/// request kind; absent fields are simply skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub request_id: u64,
    /// Byte mask rows, for segment requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<Vec<u8>>>,
    /// Estimated object count, for density requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Density grid rows, for density requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<Vec<Vec<f32>>>,
}

/// Core-side half of the worker channel pair.
pub struct WorkerLink {
    tx: Sender<WorkerRequest>,
    rx: Receiver<WorkerResponse>,
    next_request_id: u64,
}

/// Worker-side half, handed to the external collaborator.
pub struct WorkerEndpoint {
    pub requests: Receiver<WorkerRequest>,
    pub responses: Sender<WorkerResponse>,
}

impl WorkerLink {
    /// Create a connected link/endpoint pair.
    pub fn channel() -> (WorkerLink, WorkerEndpoint) {
        let (req_tx, req_rx) = channel();
        let (res_tx, res_rx) = channel();
        (
            WorkerLink {
                tx: req_tx,
                rx: res_rx,
                next_request_id: 0,
            },
            WorkerEndpoint {
                requests: req_rx,
                responses: res_tx,
            },
        )
    }

    pub fn request_segment(&mut self, box_px: [f64; 4], width: u32, height: u32) -> u64 {
        self.send(|request_id| WorkerRequest::Segment {
            request_id,
            box_px,
            width,
            height,
        })
    }

    pub fn request_density(&mut self, width: u32, height: u32) -> u64 {
        self.send(|request_id| WorkerRequest::Density {
            request_id,
            width,
            height,
        })
    }

    fn send(&mut self, build: impl FnOnce(u64) -> WorkerRequest) -> u64 {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let request = build(request_id);
        // Fire and forget: a detached worker just drops the request.
        if self.tx.send(request).is_err() {
            log::warn!("Worker request {request_id} sent with no worker attached");
        }
        request_id
    }

    /// Drain all responses that have arrived since the last poll.
    pub fn poll(&mut self) -> Vec<WorkerResponse> {
        let mut responses = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(response) => responses.push(response),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_correlate() {
        let (mut link, endpoint) = WorkerLink::channel();
        let seg_id = link.request_segment([10.0, 20.0, 110.0, 220.0], 640, 480);
        let den_id = link.request_density(640, 480);
        assert_ne!(seg_id, den_id);

        let first = endpoint.requests.recv().unwrap();
        assert_eq!(first.request_id(), seg_id);
        assert!(matches!(first, WorkerRequest::Segment { .. }));

        endpoint
            .responses
            .send(WorkerResponse {
                request_id: seg_id,
                mask: Some(vec![vec![0, 255], vec![255, 0]]),
                ..Default::default()
            })
            .unwrap();

        let polled = link.poll();
        assert_eq!(polled.len(), 1);
        assert_eq!(polled[0].request_id, seg_id);
        assert!(polled[0].mask.is_some());
        // Nothing further pending.
        assert!(link.poll().is_empty());
    }

    #[test]
    fn test_detached_worker_tolerated() {
        let (mut link, endpoint) = WorkerLink::channel();
        drop(endpoint);
        // Sends succeed from the caller's point of view and polls stay empty.
        link.request_density(100, 100);
        assert!(link.poll().is_empty());
    }

    #[test]
    fn test_request_wire_format() {
        let req = WorkerRequest::Segment {
            request_id: 3,
            box_px: [1.0, 2.0, 3.0, 4.0],
            width: 640,
            height: 480,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"segment\""));
        assert!(json.contains("\"box\":[1.0,2.0,3.0,4.0]"));

        let res: WorkerResponse =
            serde_json::from_str("{\"request_id\":3,\"count\":12}").unwrap();
        assert_eq!(res.count, Some(12));
        assert!(res.mask.is_none());
    }
}
