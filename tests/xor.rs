use std::fs::File;

use approx::assert_relative_eq;
use nalgebra::{dvector, DMatrix, DVector};
use neuragate::prelude::*;

type Weights = (Vec<Vec<f64>>, Vec<f64>, Vec<Vec<f64>>, Vec<f64>);

fn load_test_data() -> Vec<(DMatrix<f64>, DVector<f64>, DMatrix<f64>, DVector<f64>)> {
    let file = File::open("tests/xor.json").unwrap();
    let data: Vec<Weights> = serde_json::from_reader(&file).unwrap();

    fn matrix(rows: &[Vec<f64>]) -> DMatrix<f64> {
        DMatrix::from_row_slice(rows.len(), rows[0].len(), &rows.concat())
    }

    data.into_iter()
        .map(|(w1, b1, w2, b2)| {
            (
                matrix(&w1),
                DVector::from_vec(b1),
                matrix(&w2),
                DVector::from_vec(b2),
            )
        })
        .collect()
}

fn network(initial: &(DMatrix<f64>, DVector<f64>, DMatrix<f64>, DVector<f64>)) -> NeuraNetwork {
    let mut network = NeuraNetwork::new(vec![
        NeuraLayerConfig::input(2),
        NeuraLayerConfig::new(3, NeuraLayerKind::Feedforward).activation(Relu),
        NeuraLayerConfig::new(1, NeuraLayerKind::Feedforward).activation(Tanh),
    ])
    .unwrap();

    let hidden = network.model.layers[0].feedforward_mut().unwrap();
    hidden.weights.assign_values(initial.0.clone()).unwrap();
    hidden.biases.values.set_column(0, &initial.1);

    let output = network.model.layers[1].feedforward_mut().unwrap();
    output.weights.assign_values(initial.2.clone()).unwrap();
    output.biases.values.set_column(0, &initial.3);

    network
}

#[test]
fn test_xor_training() {
    let data = load_test_data();
    let mut network = network(&data[0]);

    let inputs = [
        (NeuraInput::from(dvector![0.0, 0.0]), dvector![0.0]),
        (NeuraInput::from(dvector![0.0, 1.0]), dvector![1.0]),
        (NeuraInput::from(dvector![1.0, 0.0]), dvector![1.0]),
        (NeuraInput::from(dvector![1.0, 1.0]), dvector![0.0]),
    ];

    let mut optimizer = NeuraParamsOptimizer::new(&network, NeuraLearningRate::new(0.05));
    let trainer = NeuraBatchedTrainer::new(1, 1);

    for iteration in 0..4 {
        trainer
            .train_feedforward(
                &mut network,
                &mut optimizer,
                &Euclidean,
                &inputs[iteration..=iteration],
            )
            .unwrap();

        let expected = &data[iteration + 1];
        let hidden = network.model.layers[0].feedforward().unwrap();
        let output = network.model.layers[1].feedforward().unwrap();

        assert_relative_eq!(expected.0, hidden.weights.values, epsilon = 1e-12);
        assert_relative_eq!(expected.1, hidden.biases.as_vector(), epsilon = 1e-12);
        assert_relative_eq!(expected.2, output.weights.values, epsilon = 1e-12);
        assert_relative_eq!(expected.3, output.biases.as_vector(), epsilon = 1e-12);
    }
}

#[test]
fn test_xor_loss_decreases() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut network = NeuraNetwork::new(vec![
        NeuraLayerConfig::input(2),
        NeuraLayerConfig::new(6, NeuraLayerKind::Feedforward).activation(Tanh),
        NeuraLayerConfig::new(1, NeuraLayerKind::Feedforward).activation(Sigmoid),
    ])
    .unwrap();
    network
        .initialize(&mut NeuraFixedRangeRandom::seeded(1.0, 42), 0.0)
        .unwrap();

    let inputs = [
        (NeuraInput::from(dvector![0.0, 0.0]), dvector![0.0]),
        (NeuraInput::from(dvector![0.0, 1.0]), dvector![1.0]),
        (NeuraInput::from(dvector![1.0, 0.0]), dvector![1.0]),
        (NeuraInput::from(dvector![1.0, 1.0]), dvector![0.0]),
    ];

    let mut optimizer = NeuraParamsOptimizer::new(&network, NeuraAdam::new(0.05, 0.9, 0.999, 1e-8));
    let trainer = NeuraBatchedTrainer::new(4, 300);

    let losses = trainer
        .train_feedforward(&mut network, &mut optimizer, &Euclidean, &inputs)
        .unwrap();

    assert_eq!(losses.len(), 300);
    assert!(losses[299] < losses[0]);
}
