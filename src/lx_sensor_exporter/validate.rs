// lx_sensor_exporter - Prometheus metrics exporter for Lisbon city sensors
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::Reading;

/// Value the upstream feed reports when a sensor failed to produce a reading.
pub const BAD_READ_VALUE: f64 = -99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    BadRead,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Classify a reading. Only the sentinel value is rejected, there is no range checking.
pub fn validate(reading: &Reading) -> Validity {
    if reading.value == BAD_READ_VALUE {
        Validity::BadRead
    } else {
        Validity::Valid
    }
}
