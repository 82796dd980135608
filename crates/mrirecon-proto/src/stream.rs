//! Moving whole datasets over a frame channel.

use mrirecon_frame::{ChannelState, Dimensions, FrameChannel, MessageKind};
use mrirecon_transport::Transport;
use tracing::{debug, warn};

use crate::array::SampleArray;
use crate::error::StreamError;
use crate::measurement::Measurement;
use crate::messages::{DataHeader, EndSignal};

type Result<T> = std::result::Result<T, StreamError>;

/// Receive measurements until the end signal.
///
/// Stops at the first frame that is not a well-formed measurement and
/// classifies it: a valid end signal ends the stream cleanly, a lost
/// connection is [`StreamError::Disconnected`], a broken measurement is
/// [`StreamError::MalformedMeasurement`] and anything else is
/// [`StreamError::UnexpectedFrame`].
pub fn receive_measurements<T: Transport>(
    channel: &mut FrameChannel<T>,
) -> Result<Vec<Measurement>> {
    let mut measurements = Vec::new();
    let stopped = loop {
        match channel.receive_as::<Measurement>() {
            Ok(measurement) => measurements.push(measurement),
            Err(err) => break err,
        }
    };

    match channel.state() {
        ChannelState::Holding(MessageKind::EndSignal) => {
            channel
                .receive_as::<EndSignal>()
                .map_err(StreamError::InvalidEndSignal)?;
            debug!(count = measurements.len(), "measurement stream complete");
            Ok(measurements)
        }
        ChannelState::Holding(MessageKind::Measurement) => {
            Err(StreamError::MalformedMeasurement(stopped))
        }
        ChannelState::Holding(found) => Err(StreamError::UnexpectedFrame { found }),
        ChannelState::Empty | ChannelState::Error => Err(StreamError::Disconnected(stopped)),
    }
}

/// Header shape widened so that every measurement index fits.
pub fn widen_dims(header: &Dimensions, measurements: &[Measurement]) -> Dimensions {
    let mut dims = *header;
    for measurement in measurements {
        dims.widen_to_fit(&measurement.index);
    }
    dims
}

/// Scatter measurements into `array`, skipping those that do not fit.
///
/// Returns how many were placed.
pub fn scatter_all(measurements: &[Measurement], array: &mut SampleArray) -> usize {
    let mut placed = 0usize;
    for measurement in measurements {
        match measurement.scatter_into(array) {
            Ok(()) => placed += 1,
            Err(err) => warn!(error = %err, "skipping measurement"),
        }
    }
    placed
}

/// Receive a header and its measurement stream as one array.
pub fn receive_data<T: Transport>(channel: &mut FrameChannel<T>) -> Result<SampleArray> {
    let header = channel.receive_as::<DataHeader>()?;
    let measurements = receive_measurements(channel)?;
    let dims = widen_dims(&header.dims, &measurements);
    let mut array = SampleArray::new(dims, header.complex)?;
    let placed = scatter_all(&measurements, &mut array);
    debug!(%dims, placed, total = measurements.len(), "dataset received");
    Ok(array)
}

/// Send measurements followed by the end signal.
pub fn send_measurements<T: Transport>(
    channel: &mut FrameChannel<T>,
    measurements: &[Measurement],
) -> Result<()> {
    for measurement in measurements {
        channel.send(measurement)?;
    }
    channel.send(&EndSignal)?;
    Ok(())
}

/// Send `array` as a header, one measurement per readout line, and the end
/// signal.
///
/// Lines go out with Line varying fastest, then Set, Phase, Slice, Echo,
/// Repetition, Partition, Segment, and Average slowest.
pub fn send_data<T: Transport>(channel: &mut FrameChannel<T>, array: &SampleArray) -> Result<()> {
    let dims = *array.dims();
    channel.send(&DataHeader {
        dims,
        complex: array.is_complex(),
    })?;

    let mut measurement = Measurement::new(dims.column, dims.channel, array.is_complex())?;
    let mut sent = 0usize;
    for average in 0..dims.average {
        for segment in 0..dims.segment {
            for partition in 0..dims.partition {
                for repetition in 0..dims.repetition {
                    for echo in 0..dims.echo {
                        for slice in 0..dims.slice {
                            for phase in 0..dims.phase {
                                for set in 0..dims.set {
                                    for line in 0..dims.line {
                                        measurement.index = Dimensions {
                                            column: 0,
                                            line,
                                            channel: 0,
                                            set,
                                            phase,
                                            slice,
                                            echo,
                                            repetition,
                                            segment,
                                            partition,
                                            average,
                                        };
                                        measurement.gather_from(array)?;
                                        channel.send(&measurement)?;
                                        sent += 1;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    channel.send(&EndSignal)?;
    debug!(%dims, sent, "dataset sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use mrirecon_frame::{encode_header, ChannelError};
    use mrirecon_transport::Connection;

    use super::*;
    use crate::messages::ReconAck;

    fn pair() -> (FrameChannel<Connection>, FrameChannel<Connection>) {
        let (left, right) = Connection::pair().unwrap();
        (FrameChannel::new(left), FrameChannel::new(right))
    }

    fn ramp_array(dims: Dimensions, complex: bool) -> SampleArray {
        let mut array = SampleArray::new(dims, complex).unwrap();
        for (i, v) in array.data_mut().iter_mut().enumerate() {
            *v = i as f32;
        }
        array
    }

    fn measurement_at(line: u32, samples: u32) -> Measurement {
        let mut m = Measurement::new(samples, 1, false).unwrap();
        m.index.line = line;
        m
    }

    #[test]
    fn data_roundtrip_over_socket_pair() {
        let mut dims = Dimensions::with_extent(4, 3, 2);
        dims.slice = 2;
        let array = ramp_array(dims, true);

        let (mut tx, mut rx) = pair();
        let sender = {
            let array = array.clone();
            std::thread::spawn(move || send_data(&mut tx, &array).unwrap())
        };
        let received = receive_data(&mut rx).unwrap();
        sender.join().unwrap();

        assert_eq!(received, array);
    }

    #[test]
    fn send_order_has_line_fastest() {
        let mut dims = Dimensions::with_extent(1, 2, 1);
        dims.average = 2;
        let array = ramp_array(dims, false);

        let (mut tx, mut rx) = pair();
        send_data(&mut tx, &array).unwrap();
        drop(tx);

        rx.receive_as::<DataHeader>().unwrap();
        let lines = receive_measurements(&mut rx).unwrap();
        let order: Vec<(u32, u32)> = lines
            .iter()
            .map(|m| (m.index.average, m.index.line))
            .collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(lines[3].values(), &[3.0]);
    }

    #[test]
    fn widening_covers_out_of_range_indices() {
        let header = Dimensions::with_extent(4, 2, 1);
        let mut far = measurement_at(5, 4);
        far.index.echo = 2;
        let widened = widen_dims(&header, &[measurement_at(0, 4), far]);
        assert_eq!(widened.line, 6);
        assert_eq!(widened.echo, 3);
        assert_eq!(widened.column, 4);
        assert_eq!(widened.average, 1);
    }

    #[test]
    fn end_signal_terminates_cleanly() {
        let (mut tx, mut rx) = pair();
        send_measurements(&mut tx, &[measurement_at(0, 2), measurement_at(1, 2)]).unwrap();
        let got = receive_measurements(&mut rx).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(rx.state(), ChannelState::Empty);
    }

    #[test]
    fn nonzero_end_signal_is_rejected() {
        let (mut tx, mut rx) = pair();
        tx.send(&measurement_at(0, 2)).unwrap();
        let mut frame = encode_header(MessageKind::EndSignal, 4).to_vec();
        frame.extend_from_slice(&1i32.to_le_bytes());
        tx.get_mut().write_exact(&frame).unwrap();

        let err = receive_measurements(&mut rx).unwrap_err();
        assert!(matches!(err, StreamError::InvalidEndSignal(_)));
    }

    #[test]
    fn disconnect_is_distinct_from_end() {
        let (mut tx, mut rx) = pair();
        tx.send(&measurement_at(0, 2)).unwrap();
        drop(tx);

        let err = receive_measurements(&mut rx).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Disconnected(ChannelError::Transport(_))
        ));
    }

    #[test]
    fn foreign_frame_is_a_protocol_violation() {
        let (mut tx, mut rx) = pair();
        tx.send(&ReconAck::ok("early")).unwrap();

        let err = receive_measurements(&mut rx).unwrap_err();
        assert!(matches!(
            err,
            StreamError::UnexpectedFrame {
                found: MessageKind::ReconAck
            }
        ));
        assert_eq!(rx.state(), ChannelState::Holding(MessageKind::ReconAck));
    }

    #[test]
    fn broken_measurement_is_reported() {
        let (mut tx, mut rx) = pair();
        let mut frame = encode_header(MessageKind::Measurement, 4).to_vec();
        frame.extend_from_slice(&0i32.to_le_bytes());
        tx.get_mut().write_exact(&frame).unwrap();

        let err = receive_measurements(&mut rx).unwrap_err();
        assert!(matches!(err, StreamError::MalformedMeasurement(_)));
    }

    #[test]
    fn mismatched_measurements_are_skipped() {
        let mut array = SampleArray::new(Dimensions::with_extent(2, 2, 1), false).unwrap();
        let placed = scatter_all(&[measurement_at(0, 2), measurement_at(1, 3)], &mut array);
        assert_eq!(placed, 1);
    }
}
