// Copyright (C) 2018-2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Loss detection and congestion control for a packetized data-transport
//! sender.
//!
//! This crate is the decision-making core a sender loop drives on every
//! transmission opportunity and every ack/loss notification: how many
//! packets may be outstanding right now ([`CongestionController::get_cwnd`]),
//! which outstanding packets should be considered lost
//! ([`LossDetector::detect_loss`]), and, for the probing controller, how
//! many packets to release as one paced burst
//! ([`CongestionController::get_send_batch`]).
//!
//! The crate performs no I/O and takes no time on its own; every timed
//! operation receives `now` as an argument, sourced from a [`time::Clock`].

pub mod controller;
pub mod loss;
pub mod packet;
pub mod registry;
pub mod rtt;
pub mod time;

pub use controller::{
    CongestionControlType, CongestionController, Phase, ProbingConfig, ProbingController,
    RenoConfig, RenoController,
};
pub use loss::LossDetector;
pub use packet::{AckEvent, GroupId, InflightPacket, LossEvent, PieceId, Seq};
pub use registry::{InflightPacketMap, SlabRegistry};
pub use rtt::{RttStats, SampledRttStats};
pub use time::{Clock, Duration, ManualClock, SystemClock, Timepoint};
