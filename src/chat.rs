//! Canned keyword answers for the chat endpoint.

/// Answer a free-text question with one of the canned replies, in the locale
/// of the upstream data.
///
/// `cached_customers` is whatever the customer cache currently holds; the
/// answer does not force a catalogue load.
pub fn answer(question: &str, cached_customers: usize) -> String {
  let question = question.to_lowercase();

  if question.contains("cliente") {
    return format!("Tenemos {cached_customers} clientes en la base de datos.");
  }
  if question.contains("ventas") || question.contains("pedido") {
    return "Consulta /api/analytics/dashboard para ver estadísticas de ventas.".to_string();
  }
  "No entiendo la pregunta, prueba con 'clientes' o 'ventas'.".to_string()
}
