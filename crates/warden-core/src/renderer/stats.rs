// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

/// Counters read back from a resolved pipeline-statistics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatistics {
    /// Number of vertex-shader invocations.
    pub vs_invocations: u64,
    /// Number of pixel-shader invocations.
    pub ps_invocations: u64,
    /// Number of primitives sent to the rasterizer.
    pub raster_primitives: u64,
}

impl fmt::Display for PipelineStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} VS | {} PS | {} Raster",
            self.vs_invocations, self.ps_invocations, self.raster_primitives
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_report_format() {
        let stats = PipelineStatistics {
            vs_invocations: 3,
            ps_invocations: 120,
            raster_primitives: 1,
        };
        assert_eq!(format!("{stats}"), "3 VS | 120 PS | 1 Raster");
    }
}
